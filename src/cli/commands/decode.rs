use clap::Args;
use serde_json::json;
use tracing::{debug, info};

use crate::codec::script_hex_to_metadata;
use crate::errors::{CodecError, CodecResult};
use crate::types::{Address, Genesis, Message, PaymentRef, TransferList};

/// Decode every CoinSpark section carried by an OP_RETURN script
#[derive(Args)]
pub struct DecodeScriptCommand {
    /// OP_RETURN scriptPubKey as hex
    pub script: String,

    /// Number of inputs of the carrying transaction
    #[arg(long, default_value_t = 1)]
    pub inputs: usize,

    /// Number of outputs of the carrying transaction
    #[arg(long, default_value_t = 2)]
    pub outputs: usize,

    /// Emit JSON instead of the text rendering
    #[arg(long)]
    pub json: bool,
}

impl DecodeScriptCommand {
    pub fn run(&self) -> CodecResult<()> {
        let metadata = script_hex_to_metadata(&self.script).ok_or_else(|| {
            CodecError::NotCoinSpark("script is not an OP_RETURN payload".to_string())
        })?;
        info!("script carries {} bytes of metadata", metadata.len());

        let genesis = Genesis::decode(&metadata).ok();
        let payment_ref = PaymentRef::decode(&metadata).ok();
        let transfers = TransferList::decode(&metadata, self.inputs, self.outputs)
            .ok()
            .filter(|list| !list.transfers.is_empty());
        let message = Message::decode(&metadata, self.outputs).ok();

        if genesis.is_none() && payment_ref.is_none() && transfers.is_none() && message.is_none() {
            return Err(CodecError::NotCoinSpark(
                "no decodable CoinSpark section".to_string(),
            ));
        }
        debug!(
            "sections: genesis={} payment_ref={} transfers={} message={}",
            genesis.is_some(),
            payment_ref.is_some(),
            transfers.is_some(),
            message.is_some()
        );

        if self.json {
            let report = json!({
                "genesis": genesis,
                "payment_ref": payment_ref,
                "transfers": transfers,
                "message": message,
            });
            println!("{}", serde_json::to_string_pretty(&report).expect("serializable report"));
            return Ok(());
        }

        if let Some(genesis) = genesis {
            print!("{}", genesis);
        }
        if let Some(payment_ref) = payment_ref {
            print!("{}", payment_ref);
        }
        if let Some(transfers) = transfers {
            print!("{}", transfers);
        }
        if let Some(message) = message {
            print!("{}", message);
        }
        Ok(())
    }
}

/// Decode a CoinSpark address string
#[derive(Args)]
pub struct DecodeAddressCommand {
    /// CoinSpark address (starts with 's')
    pub address: String,

    /// Emit JSON instead of the text rendering
    #[arg(long)]
    pub json: bool,
}

impl DecodeAddressCommand {
    pub fn run(&self) -> CodecResult<()> {
        let address = Address::decode(&self.address)?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&address).expect("serializable address")
            );
        } else {
            print!("{}", address);
        }
        Ok(())
    }
}
