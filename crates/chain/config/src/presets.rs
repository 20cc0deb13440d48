//! Configurations for public Kaia networks.

use crate::{ChainConfig, Hardfork, HardforkActivation, HardforkActivations};

/// Mainnet chain ID
pub const MAINNET_CHAIN_ID: u64 = 8217;

/// Kairos testnet chain ID
pub const KAIROS_CHAIN_ID: u64 = 1001;

const MAINNET_HARDFORKS: &[HardforkActivation<Hardfork>] = &[
    HardforkActivation {
        block_number: 0,
        hardfork: Hardfork::SpuriousDragon,
    },
    HardforkActivation {
        block_number: 86_816_005,
        hardfork: Hardfork::Istanbul,
    },
    HardforkActivation {
        block_number: 86_816_005,
        hardfork: Hardfork::London,
    },
    HardforkActivation {
        block_number: 86_816_005,
        hardfork: Hardfork::EthTxType,
    },
    HardforkActivation {
        block_number: 99_841_497,
        hardfork: Hardfork::Magma,
    },
    HardforkActivation {
        block_number: 119_750_400,
        hardfork: Hardfork::Kore,
    },
    HardforkActivation {
        block_number: 135_456_000,
        hardfork: Hardfork::Shanghai,
    },
    HardforkActivation {
        block_number: 147_534_000,
        hardfork: Hardfork::Cancun,
    },
    HardforkActivation {
        block_number: 162_900_480,
        hardfork: Hardfork::Kaia,
    },
];

const KAIROS_HARDFORKS: &[HardforkActivation<Hardfork>] = &[
    HardforkActivation {
        block_number: 0,
        hardfork: Hardfork::SpuriousDragon,
    },
    HardforkActivation {
        block_number: 75_373_312,
        hardfork: Hardfork::Istanbul,
    },
    HardforkActivation {
        block_number: 80_295_291,
        hardfork: Hardfork::London,
    },
    HardforkActivation {
        block_number: 86_513_895,
        hardfork: Hardfork::EthTxType,
    },
    HardforkActivation {
        block_number: 98_347_376,
        hardfork: Hardfork::Magma,
    },
    HardforkActivation {
        block_number: 111_736_800,
        hardfork: Hardfork::Kore,
    },
    HardforkActivation {
        block_number: 131_608_000,
        hardfork: Hardfork::Shanghai,
    },
    HardforkActivation {
        block_number: 141_367_000,
        hardfork: Hardfork::Cancun,
    },
    HardforkActivation {
        block_number: 156_660_000,
        hardfork: Hardfork::Kaia,
    },
];

/// Returns the configuration of Kaia mainnet.
pub fn mainnet() -> ChainConfig {
    ChainConfig {
        name: "Mainnet".to_string(),
        chain_id: MAINNET_CHAIN_ID,
        hardfork_activations: HardforkActivations::from(MAINNET_HARDFORKS),
    }
}

/// Returns the configuration of the Kairos testnet.
pub fn kairos() -> ChainConfig {
    ChainConfig {
        name: "Kairos".to_string(),
        chain_id: KAIROS_CHAIN_ID,
        hardfork_activations: HardforkActivations::from(KAIROS_HARDFORKS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activations_are_sorted() {
        for config in [mainnet(), kairos()] {
            let activations = config.hardfork_activations.into_inner();
            assert!(activations
                .windows(2)
                .all(|pair| pair[0].block_number <= pair[1].block_number
                    && pair[0].hardfork < pair[1].hardfork));
        }
    }

    #[test]
    fn mainnet_eth_tx_type_activation() {
        let config = mainnet();

        assert!(!config.rules(86_816_004).is_eth_tx_type);
        assert!(config.rules(86_816_005).is_eth_tx_type);
        assert!(config.rules(86_816_005).is_london);
    }
}
