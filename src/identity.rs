//! Principal names and temporary passwords for new accounts.

use rand::{Rng, seq::SliceRandom};

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*";

/// Length of generated temporary passwords.
pub const TEMPORARY_PASSWORD_LEN: usize = 16;

/// Build the user principal name: `first.last@domain`, names lowercased.
///
/// Identical inputs always produce the identical principal name.
pub fn principal_name(first_name: &str, last_name: &str, domain: &str) -> String {
    format!(
        "{}.{}@{}",
        first_name.to_lowercase(),
        last_name.to_lowercase(),
        domain
    )
}

/// Generate a random temporary password.
///
/// The password contains at least one uppercase letter, lowercase letter,
/// digit and symbol. The remaining characters are drawn uniformly from all
/// four classes and the result is shuffled. Never log the returned value.
pub fn generate_temporary_password() -> String {
    let mut rng = rand::thread_rng();
    let all: Vec<u8> = [UPPERCASE, LOWERCASE, DIGITS, SYMBOLS].concat();

    let mut chars: Vec<u8> = Vec::with_capacity(TEMPORARY_PASSWORD_LEN);
    for class in [UPPERCASE, LOWERCASE, DIGITS, SYMBOLS] {
        chars.push(class[rng.gen_range(0..class.len())]);
    }
    while chars.len() < TEMPORARY_PASSWORD_LEN {
        chars.push(all[rng.gen_range(0..all.len())]);
    }
    chars.shuffle(&mut rng);

    chars.into_iter().map(char::from).collect()
}
