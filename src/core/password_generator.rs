use rand::rngs::OsRng;
use rand::Rng;

use crate::error::{Result, StrongboxError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordConfig {
    pub length: usize,
    pub lowercase: bool,
    pub uppercase: bool,
    pub digits: bool,
    pub specials: bool,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            length: 20,
            lowercase: true,
            uppercase: true,
            digits: true,
            specials: true,
        }
    }
}

pub const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
pub const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const DIGITS: &str = "0123456789";
pub const SPECIALS: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Union of the selected character classes, in a fixed order.
pub fn alphabet(config: &PasswordConfig) -> Vec<char> {
    let classes = [
        (config.lowercase, LOWERCASE),
        (config.uppercase, UPPERCASE),
        (config.digits, DIGITS),
        (config.specials, SPECIALS),
    ];
    classes
        .iter()
        .filter(|(selected, _)| *selected)
        .flat_map(|(_, class)| class.chars())
        .collect()
}

/// Draw `length` characters independently and uniformly from the selected
/// alphabet, using the operating system's CSPRNG.
///
/// No class is guaranteed to appear in the result.
pub fn generate_password(config: &PasswordConfig) -> Result<String> {
    if config.length == 0 {
        return Err(StrongboxError::InvalidLength);
    }
    let chars = alphabet(config);
    if chars.is_empty() {
        return Err(StrongboxError::EmptyAlphabet);
    }

    let mut rng = OsRng;
    Ok((0..config.length)
        .map(|_| chars[rng.gen_range(0..chars.len())])
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only(lowercase: bool, uppercase: bool, digits: bool, specials: bool) -> PasswordConfig {
        PasswordConfig {
            length: 12,
            lowercase,
            uppercase,
            digits,
            specials,
        }
    }

    #[test]
    fn test_default_config() {
        let password = generate_password(&PasswordConfig::default()).unwrap();
        assert_eq!(password.chars().count(), 20);
    }

    #[test]
    fn test_only_lowercase() {
        let password = generate_password(&only(true, false, false, false)).unwrap();
        assert_eq!(password.len(), 12);
        assert!(password.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_only_digits() {
        let config = PasswordConfig {
            length: 30,
            ..only(false, false, true, false)
        };
        let password = generate_password(&config).unwrap();
        assert!(password.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_only_specials() {
        let config = PasswordConfig {
            length: 40,
            ..only(false, false, false, true)
        };
        let password = generate_password(&config).unwrap();
        assert!(password.chars().all(|c| SPECIALS.contains(c)));
    }

    #[test]
    fn test_zero_length_fails() {
        let config = PasswordConfig {
            length: 0,
            ..PasswordConfig::default()
        };
        assert!(matches!(
            generate_password(&config),
            Err(StrongboxError::InvalidLength)
        ));
    }

    #[test]
    fn test_no_class_fails() {
        assert!(matches!(
            generate_password(&only(false, false, false, false)),
            Err(StrongboxError::EmptyAlphabet)
        ));
    }

    #[test]
    fn test_alphabet_sizes() {
        assert_eq!(alphabet(&only(true, true, true, true)).len(), 26 + 26 + 10 + 32);
        assert_eq!(SPECIALS.chars().count(), 32);
        assert!(SPECIALS.chars().all(|c| c.is_ascii_punctuation()));
    }

    #[test]
    fn test_every_character_reachable() {
        // The last character of the alphabet must be drawable too.
        let config = PasswordConfig {
            length: 2000,
            ..only(false, false, true, false)
        };
        let password = generate_password(&config).unwrap();
        for digit in DIGITS.chars() {
            assert!(password.contains(digit), "digit {digit} never drawn");
        }
    }

    #[test]
    fn test_uniqueness() {
        let config = PasswordConfig::default();
        let p1 = generate_password(&config).unwrap();
        let p2 = generate_password(&config).unwrap();
        assert_ne!(p1, p2);
    }
}
