//! CSI argument parsing
//!
//! Arguments are a `;`-separated list of non-negative decimal integers.
//! An empty field means "use the operation's default". Anything else is
//! malformed and aborts the sequence it belongs to.

use serde::{Deserialize, Serialize};

use super::SequenceError;

/// Parsed CSI parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    values: Vec<Option<u32>>,
}

impl Params {
    /// Parse an argument string (without private marker)
    ///
    /// An empty string yields no parameters at all.
    pub fn parse(args: &str) -> Result<Self, SequenceError> {
        if args.is_empty() {
            return Ok(Self::default());
        }

        let values = args
            .split(';')
            .map(parse_field)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { values })
    }

    /// Get parameter `index`, or `default` if missing or empty
    pub fn get(&self, index: usize, default: u32) -> u32 {
        self.values.get(index).copied().flatten().unwrap_or(default)
    }

    /// Get parameter `index` as a count/coordinate
    pub fn get_usize(&self, index: usize, default: usize) -> usize {
        self.raw(index).map_or(default, |value| value as usize)
    }

    /// Raw parameter at `index` (`None` for missing or empty)
    pub fn raw(&self, index: usize) -> Option<u32> {
        self.values.get(index).copied().flatten()
    }

    /// Number of fields, including empty ones
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no fields
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parse a single field: empty is `None`, digits are a value
pub fn parse_field(field: &str) -> Result<Option<u32>, SequenceError> {
    if field.is_empty() {
        return Ok(None);
    }

    if field.bytes().all(|b| b.is_ascii_digit()) {
        let value = field.bytes().fold(0u32, |acc, b| {
            acc.saturating_mul(10).saturating_add(u32::from(b - b'0'))
        });
        return Ok(Some(value));
    }

    match field.strip_prefix('-') {
        Some(rest) if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) => {
            Err(SequenceError::NegativeInteger(field.to_string()))
        }
        _ => Err(SequenceError::InvalidInteger(field.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_args_use_defaults() {
        let params = Params::parse("").unwrap();
        assert!(params.is_empty());
        assert_eq!(params.get(0, 1), 1);
        assert_eq!(params.get(1, 24), 24);
    }

    #[test]
    fn test_list() {
        let params = Params::parse("10;20").unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params.get(0, 1), 10);
        assert_eq!(params.get(1, 1), 20);
        assert_eq!(params.get(2, 7), 7);
    }

    #[test]
    fn test_empty_fields_default() {
        let params = Params::parse(";5").unwrap();
        assert_eq!(params.get(0, 1), 1);
        assert_eq!(params.get(1, 1), 5);
        assert_eq!(params.raw(0), None);
    }

    #[test]
    fn test_zero_is_a_value() {
        let params = Params::parse("0").unwrap();
        assert_eq!(params.get(0, 1), 0);
    }

    #[test]
    fn test_malformed() {
        assert_eq!(
            Params::parse("x"),
            Err(SequenceError::InvalidInteger("x".to_string()))
        );
        assert_eq!(
            Params::parse("1;2!"),
            Err(SequenceError::InvalidInteger("2!".to_string()))
        );
        assert_eq!(
            Params::parse("-3"),
            Err(SequenceError::NegativeInteger("-3".to_string()))
        );
        assert!(Params::parse("-").is_err());
        assert!(Params::parse("?25").is_err());
    }

    #[test]
    fn test_huge_values_saturate() {
        let params = Params::parse("99999999999999").unwrap();
        assert_eq!(params.get(0, 0), u32::MAX);
    }
}
