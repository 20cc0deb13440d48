/// Hardforks relevant to transaction handling, in activation order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Hardfork {
    /// Unprotected legacy signatures
    Frontier,
    /// Canonical signature S-values
    Homestead,
    /// Replay protection (EIP-155)
    SpuriousDragon,
    /// Calldata repricing (EIP-2028)
    Istanbul,
    /// Base fee
    London,
    /// Ethereum access list and dynamic fee transactions
    EthTxType,
    /// Dynamic base fee
    Magma,
    /// Governance and reward changes
    Kore,
    /// Initcode metering (EIP-3860)
    Shanghai,
    /// Blob transactions
    Cancun,
    /// Kaia transition
    Kaia,
    /// Set-code transactions and floor data gas
    Prague,
}

impl Hardfork {
    /// The latest supported hardfork.
    pub const LATEST: Self = Self::Prague;

    /// Returns the hardfork's name.
    pub fn name(&self) -> &'static str {
        match self {
            Hardfork::Frontier => "frontier",
            Hardfork::Homestead => "homestead",
            Hardfork::SpuriousDragon => "spuriousDragon",
            Hardfork::Istanbul => "istanbul",
            Hardfork::London => "london",
            Hardfork::EthTxType => "ethTxType",
            Hardfork::Magma => "magma",
            Hardfork::Kore => "kore",
            Hardfork::Shanghai => "shanghai",
            Hardfork::Cancun => "cancun",
            Hardfork::Kaia => "kaia",
            Hardfork::Prague => "prague",
        }
    }
}

impl std::fmt::Display for Hardfork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_name_matches_display() -> anyhow::Result<()> {
        for hardfork in [
            Hardfork::Frontier,
            Hardfork::SpuriousDragon,
            Hardfork::EthTxType,
            Hardfork::Prague,
        ] {
            let json = serde_json::to_value(hardfork)?;
            assert_eq!(json, serde_json::Value::String(hardfork.to_string()));
        }

        Ok(())
    }
}
