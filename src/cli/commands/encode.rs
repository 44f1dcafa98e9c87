use clap::Args;
use tracing::info;

use crate::errors::CodecResult;
use crate::types::{Address, PaymentRef};

/// Wrap a Bitcoin address into a CoinSpark address
#[derive(Args)]
pub struct EncodeAddressCommand {
    /// The Bitcoin address to wrap
    pub bitcoin_address: String,

    /// Address capability flags (assets=1, payment refs=2, text=4, files=8)
    #[arg(long, default_value_t = 0)]
    pub flags: u32,

    /// Payment reference to embed
    #[arg(long, default_value_t = 0)]
    pub payment_ref: u64,
}

impl EncodeAddressCommand {
    pub fn run(&self) -> CodecResult<()> {
        let address = Address::new(
            &self.bitcoin_address,
            self.flags,
            PaymentRef(self.payment_ref),
        );
        let encoded = address.encode()?;
        info!("encoded {} characters", encoded.len());
        println!("{}", encoded);
        Ok(())
    }
}
