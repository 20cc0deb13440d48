//! Chain configuration and hardfork activation predicates.

mod hardfork;
mod presets;

pub use self::{
    hardfork::Hardfork,
    presets::{kairos, mainnet, KAIROS_CHAIN_ID, MAINNET_CHAIN_ID},
};

/// A type representing the activation of a hardfork.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HardforkActivation<HardforkT> {
    /// The block number at which the hardfork activates.
    pub block_number: u64,
    /// The hardfork to be activated.
    pub hardfork: HardforkT,
}

/// A struct that stores the hardforks for a chain.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct HardforkActivations<HardforkT> {
    /// (Start block number -> hardfork) mapping
    hardforks: Vec<HardforkActivation<HardforkT>>,
}

impl<HardforkT> Default for HardforkActivations<HardforkT> {
    fn default() -> Self {
        Self {
            hardforks: Vec::new(),
        }
    }
}

impl<HardforkT> HardforkActivations<HardforkT> {
    /// Constructs a new instance with the provided hardforks.
    pub fn new(hardforks: Vec<HardforkActivation<HardforkT>>) -> Self {
        Self { hardforks }
    }

    /// Returns the inner hardforks.
    pub fn into_inner(self) -> Vec<HardforkActivation<HardforkT>> {
        self.hardforks
    }

    /// Creates a new instance for a new chain with the provided hardfork.
    pub fn with_hardfork(hardfork: HardforkT) -> Self {
        Self {
            hardforks: vec![HardforkActivation {
                block_number: 0,
                hardfork,
            }],
        }
    }

    /// Whether no hardforks activations are present.
    pub fn is_empty(&self) -> bool {
        self.hardforks.is_empty()
    }
}

impl<HardforkT: Clone> HardforkActivations<HardforkT> {
    /// Returns the hardfork that is active at the provided block number.
    pub fn hardfork_at_block(&self, block_number: u64) -> Option<HardforkT> {
        self.hardforks
            .iter()
            .rev()
            .find(|activation| block_number >= activation.block_number)
            .map(|activation| activation.hardfork.clone())
    }
}

impl<HardforkT: Clone> From<&[HardforkActivation<HardforkT>]> for HardforkActivations<HardforkT> {
    fn from(hardforks: &[HardforkActivation<HardforkT>]) -> Self {
        Self {
            hardforks: hardforks.to_vec(),
        }
    }
}

/// Type that stores the configuration for a chain.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    /// Chain name
    pub name: String,
    /// Chain id used for replay protection
    pub chain_id: u64,
    /// Hardfork activations for the chain
    pub hardfork_activations: HardforkActivations<Hardfork>,
}

impl ChainConfig {
    /// Creates a configuration for a chain that activates every hardfork up to
    /// and including the provided one from genesis.
    pub fn with_hardfork(chain_id: u64, hardfork: Hardfork) -> Self {
        Self {
            name: format!("chain {chain_id}"),
            chain_id,
            hardfork_activations: HardforkActivations::with_hardfork(hardfork),
        }
    }

    /// Returns the hardfork that is active at the provided block number.
    ///
    /// Defaults to [`Hardfork::Frontier`] before the first activation.
    pub fn hardfork_at_block(&self, block_number: u64) -> Hardfork {
        self.hardfork_activations
            .hardfork_at_block(block_number)
            .unwrap_or(Hardfork::Frontier)
    }

    /// Returns whether the provided hardfork is active at the provided block
    /// number.
    pub fn is_active(&self, hardfork: Hardfork, block_number: u64) -> bool {
        self.hardfork_at_block(block_number) >= hardfork
    }

    /// Returns the activation predicates at the provided block number.
    pub fn rules(&self, block_number: u64) -> Rules {
        Rules::new(
            self.chain_id,
            block_number,
            self.hardfork_at_block(block_number),
        )
    }
}

/// Hardfork activation predicates for a single block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rules {
    /// Chain id
    pub chain_id: u64,
    /// Block number the predicates were evaluated at
    pub block_number: u64,
    /// The active hardfork
    pub hardfork: Hardfork,
    pub is_homestead: bool,
    pub is_eip155: bool,
    pub is_istanbul: bool,
    pub is_london: bool,
    pub is_eth_tx_type: bool,
    pub is_magma: bool,
    pub is_kore: bool,
    pub is_shanghai: bool,
    pub is_cancun: bool,
    pub is_kaia: bool,
    pub is_prague: bool,
}

impl Rules {
    /// Constructs the predicates for the provided active hardfork.
    pub fn new(chain_id: u64, block_number: u64, hardfork: Hardfork) -> Self {
        Self {
            chain_id,
            block_number,
            hardfork,
            is_homestead: hardfork >= Hardfork::Homestead,
            is_eip155: hardfork >= Hardfork::SpuriousDragon,
            is_istanbul: hardfork >= Hardfork::Istanbul,
            is_london: hardfork >= Hardfork::London,
            is_eth_tx_type: hardfork >= Hardfork::EthTxType,
            is_magma: hardfork >= Hardfork::Magma,
            is_kore: hardfork >= Hardfork::Kore,
            is_shanghai: hardfork >= Hardfork::Shanghai,
            is_cancun: hardfork >= Hardfork::Cancun,
            is_kaia: hardfork >= Hardfork::Kaia,
            is_prague: hardfork >= Hardfork::Prague,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_config() -> ChainConfig {
        ChainConfig {
            name: "test".to_string(),
            chain_id: 1001,
            hardfork_activations: HardforkActivations::new(vec![
                HardforkActivation {
                    block_number: 0,
                    hardfork: Hardfork::SpuriousDragon,
                },
                HardforkActivation {
                    block_number: 10,
                    hardfork: Hardfork::EthTxType,
                },
                HardforkActivation {
                    block_number: 20,
                    hardfork: Hardfork::Cancun,
                },
                HardforkActivation {
                    block_number: 30,
                    hardfork: Hardfork::Prague,
                },
            ]),
        }
    }

    #[test]
    fn hardfork_at_block() {
        let config = dummy_config();

        assert_eq!(config.hardfork_at_block(0), Hardfork::SpuriousDragon);
        assert_eq!(config.hardfork_at_block(9), Hardfork::SpuriousDragon);
        assert_eq!(config.hardfork_at_block(10), Hardfork::EthTxType);
        assert_eq!(config.hardfork_at_block(25), Hardfork::Cancun);
        assert_eq!(config.hardfork_at_block(u64::MAX), Hardfork::Prague);
    }

    #[test]
    fn missing_activations_default_to_frontier() {
        let config = ChainConfig {
            name: "empty".to_string(),
            chain_id: 1,
            hardfork_activations: HardforkActivations::default(),
        };

        assert_eq!(config.hardfork_at_block(100), Hardfork::Frontier);
        assert!(!config.rules(100).is_homestead);
    }

    #[test]
    fn rules_are_cumulative() {
        let rules = dummy_config().rules(20);

        assert_eq!(rules.block_number, 20);
        assert!(rules.is_eip155);
        assert!(rules.is_istanbul);
        assert!(rules.is_london);
        assert!(rules.is_eth_tx_type);
        assert!(rules.is_shanghai);
        assert!(rules.is_cancun);
        assert!(!rules.is_kaia);
        assert!(!rules.is_prague);
    }

    #[test]
    fn deserialize_json() -> anyhow::Result<()> {
        let json = r#"{
            "name": "local",
            "chainId": 31337,
            "hardforkActivations": [
                { "blockNumber": 0, "hardfork": "istanbul" },
                { "blockNumber": 5, "hardfork": "ethTxType" }
            ]
        }"#;

        let config: ChainConfig = serde_json::from_str(json)?;
        assert_eq!(config.chain_id, 31337);
        assert_eq!(config.hardfork_at_block(4), Hardfork::Istanbul);
        assert_eq!(config.hardfork_at_block(5), Hardfork::EthTxType);

        Ok(())
    }

    #[test]
    fn deserialize_toml() -> anyhow::Result<()> {
        let source = r#"
            name = "local"
            chainId = 1001

            [[hardforkActivations]]
            blockNumber = 0
            hardfork = "prague"
        "#;

        let config: ChainConfig = toml::from_str(source)?;
        assert!(config.rules(0).is_prague);

        Ok(())
    }
}
