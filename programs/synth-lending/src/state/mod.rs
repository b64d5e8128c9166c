pub mod amount_book;
pub mod asset;
pub mod config;
pub mod market;
pub mod rate_feed;

pub use amount_book::*;
pub use asset::*;
pub use config::*;
pub use market::*;
pub use rate_feed::*;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::program_error::ProgramError;

/// Read state from the front of an account; the rest is padding
pub fn unpack_account<T: BorshDeserialize>(data: &[u8]) -> Result<T, ProgramError> {
    let mut cursor = data;
    T::deserialize(&mut cursor).map_err(|_| ProgramError::InvalidAccountData)
}

pub fn pack_account<T: BorshSerialize>(value: &T, data: &mut [u8]) -> Result<(), ProgramError> {
    let bytes = value.try_to_vec().map_err(|_| ProgramError::InvalidAccountData)?;
    if bytes.len() > data.len() {
        return Err(ProgramError::AccountDataTooSmall);
    }
    data[..bytes.len()].copy_from_slice(&bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_program::pubkey::Pubkey;

    #[test]
    fn test_padded_account_round_trip() {
        let book = AmountBook::new(Pubkey::new_unique(), Pubkey::new_unique(), 7);
        let mut data = vec![0u8; AmountBook::LEN];
        pack_account(&book, &mut data).unwrap();

        let loaded: AmountBook = unpack_account(&data).unwrap();
        assert_eq!(loaded, book);
    }

    #[test]
    fn test_pack_into_short_account_fails() {
        let book = AmountBook::new(Pubkey::new_unique(), Pubkey::new_unique(), 7);
        let mut data = vec![0u8; 16];
        assert_eq!(
            pack_account(&book, &mut data),
            Err(ProgramError::AccountDataTooSmall)
        );
    }
}
