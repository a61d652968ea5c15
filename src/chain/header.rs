use crate::error::ConnectionError;

/// Largest `extraData` field the base protocol allows in a block header, in bytes.
pub const MAX_EXTRA_DATA_BYTES: usize = 32;

/// Checks a block header's `extraData` length against the chain's consensus flavour.
///
/// Proof-of-authority chains (Clique, BSC, Polygon PoS) pack signer data into `extraData` and
/// routinely exceed [`MAX_EXTRA_DATA_BYTES`]. With `proof_of_authority` set that is accepted;
/// otherwise the header is reported as malformed, which points at a misconfigured chain.
pub(crate) fn check_extra_data(
    chain_id: u64,
    extra_data_len: usize,
    proof_of_authority: bool,
) -> Result<(), ConnectionError> {
    if extra_data_len <= MAX_EXTRA_DATA_BYTES || proof_of_authority {
        return Ok(());
    }
    Err(ConnectionError::fatal(
        chain_id,
        format!(
            "block header extraData is {extra_data_len} bytes, above the {MAX_EXTRA_DATA_BYTES} \
             byte maximum; set proof_of_authority for this chain"
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_header_passes_without_flag() {
        assert!(check_extra_data(1, 0, false).is_ok());
        assert!(check_extra_data(1, MAX_EXTRA_DATA_BYTES, false).is_ok());
    }

    #[test]
    fn oversized_extra_data_is_fatal_without_flag() {
        let err = check_extra_data(5, 97, false).unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(err.chain_id(), 5);
    }

    #[test]
    fn oversized_extra_data_is_tolerated_on_poa_chains() {
        assert!(check_extra_data(80001, 97, true).is_ok());
    }
}
