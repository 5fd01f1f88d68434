//! Filter form state shared by the list views.

use blake2::{Blake2b512, Digest};
use thiserror::Error;

use crate::navigation::QueryParams;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("invalid address `{0}`")]
    InvalidAddress(String),
    #[error("address `{0}` has a bad checksum")]
    BadChecksum(String),
}

/// A field of a list filter form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterField {
    Pallet,
    CallName,
    EventName,
    Address,
}

impl FilterField {
    /// Name of the field in the view's query string
    pub fn query_key(&self) -> &'static str {
        match self {
            Self::Pallet => "pallet",
            Self::CallName => "callName",
            Self::EventName => "eventName",
            Self::Address => "address",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pallet => "Pallet",
            Self::CallName => "Call",
            Self::EventName => "Event",
            Self::Address => "Address",
        }
    }
}

/// Values of a filter form, in display order.
///
/// A dependent field is cleared whenever its parent changes, since the
/// parent scopes the dependent's valid choices.
#[derive(Debug, Clone)]
pub struct FilterForm {
    values: Vec<(FilterField, String)>,
    dependents: Vec<(FilterField, FilterField)>,
}

impl FilterForm {
    pub fn new(fields: &[FilterField]) -> Self {
        Self {
            values: fields.iter().map(|f| (*f, String::new())).collect(),
            dependents: Vec::new(),
        }
    }

    pub fn with_dependent(mut self, parent: FilterField, child: FilterField) -> Self {
        self.dependents.push((parent, child));
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = FilterField> + '_ {
        self.values.iter().map(|(f, _)| *f)
    }

    pub fn value(&self, field: FilterField) -> &str {
        self.values
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// Set a field from user input. Returns whether the form changed.
    /// Changing a parent silently clears its dependents.
    pub fn set(&mut self, field: FilterField, value: &str) -> bool {
        if !self.patch(field, value) {
            return false;
        }

        let children: Vec<FilterField> = self
            .dependents
            .iter()
            .filter(|(parent, _)| *parent == field)
            .map(|(_, child)| *child)
            .collect();
        for child in children {
            self.patch(child, "");
        }
        true
    }

    /// Set a field without touching its dependents
    fn patch(&mut self, field: FilterField, value: &str) -> bool {
        let value = value.trim();
        match self.values.iter_mut().find(|(f, _)| *f == field) {
            Some((_, current)) if current != value => {
                *current = value.to_string();
                true
            }
            _ => false,
        }
    }

    /// Clear every field. Returns whether the form changed.
    pub fn reset(&mut self) -> bool {
        let mut changed = false;
        for (_, value) in &mut self.values {
            if !value.is_empty() {
                value.clear();
                changed = true;
            }
        }
        changed
    }

    /// Patch every field from query params (missing keys mean empty).
    /// Returns whether the form changed.
    pub fn patch_from_query(&mut self, query: &QueryParams) -> bool {
        let fields: Vec<FilterField> = self.fields().collect();
        let mut changed = false;
        for field in fields {
            let value = query.get(field.query_key()).map(String::as_str).unwrap_or("");
            changed |= self.patch(field, value);
        }
        changed
    }

    /// Query params reflecting the form; empty fields map to empty values so
    /// a merge removes them.
    pub fn to_query(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(f, v)| (f.query_key().to_string(), v.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|(_, v)| v.is_empty())
    }
}

// ============================================================================
// Account decoding
// ============================================================================

const SS58_PREFIX: &[u8] = b"SS58PRE";

/// Decode a typed account into its `0x`-prefixed hex account id.
///
/// Accepts either a 32-byte hex account id or an SS58 address with a one
/// or two byte network prefix.
pub fn account_id_hex(input: &str) -> Result<String, FilterError> {
    let trimmed = input.trim();
    let invalid = || FilterError::InvalidAddress(trimmed.to_string());

    if let Some(hex_part) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        let bytes = hex::decode(hex_part).map_err(|_| invalid())?;
        if bytes.len() != 32 {
            return Err(invalid());
        }
        return Ok(format!("0x{}", hex::encode(bytes)));
    }

    let data = bs58::decode(trimmed).into_vec().map_err(|_| invalid())?;
    let prefix_len = match data.first() {
        Some(b) if *b < 64 => 1,
        Some(b) if *b < 128 => 2,
        _ => return Err(invalid()),
    };
    // prefix + 32 byte account id + 2 byte checksum
    if data.len() != prefix_len + 32 + 2 {
        return Err(invalid());
    }

    let (body, checksum) = data.split_at(data.len() - 2);
    let mut hasher = Blake2b512::new();
    hasher.update(SS58_PREFIX);
    hasher.update(body);
    let hash = hasher.finalize();
    if hash[..2] != checksum[..] {
        return Err(FilterError::BadChecksum(trimmed.to_string()));
    }

    Ok(format!("0x{}", hex::encode(&body[prefix_len..])))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extrinsic_form() -> FilterForm {
        FilterForm::new(&[FilterField::Pallet, FilterField::CallName, FilterField::Address])
            .with_dependent(FilterField::Pallet, FilterField::CallName)
    }

    #[test]
    fn test_parent_change_clears_dependent() {
        let mut form = extrinsic_form();
        form.set(FilterField::Pallet, "Balances");
        form.set(FilterField::CallName, "transfer");

        assert!(form.set(FilterField::Pallet, "Staking"));
        assert_eq!(form.value(FilterField::Pallet), "Staking");
        assert_eq!(form.value(FilterField::CallName), "");
    }

    #[test]
    fn test_setting_same_value_is_not_a_change() {
        let mut form = extrinsic_form();
        form.set(FilterField::Pallet, "Balances");
        form.set(FilterField::CallName, "transfer");

        assert!(!form.set(FilterField::Pallet, "Balances"));
        assert_eq!(form.value(FilterField::CallName), "transfer");
    }

    #[test]
    fn test_patch_from_query_keeps_dependents() {
        let mut form = extrinsic_form();
        let mut query = QueryParams::new();
        query.insert("pallet".into(), "Balances".into());
        query.insert("callName".into(), "transfer".into());

        assert!(form.patch_from_query(&query));
        assert_eq!(form.value(FilterField::CallName), "transfer");
        assert!(!form.patch_from_query(&query));
    }

    #[test]
    fn test_to_query_includes_empty_fields() {
        let mut form = extrinsic_form();
        form.set(FilterField::Pallet, "Balances");
        let query = form.to_query();
        assert!(query.contains(&("pallet".to_string(), "Balances".to_string())));
        assert!(query.contains(&("callName".to_string(), String::new())));
    }

    #[test]
    fn test_reset_clears_all() {
        let mut form = extrinsic_form();
        form.set(FilterField::Address, "0x00");
        assert!(form.reset());
        assert!(form.is_empty());
        assert!(!form.reset());
    }

    #[test]
    fn test_account_id_from_ss58() {
        // Well-known dev account Alice
        let hex = account_id_hex("5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY").unwrap();
        assert_eq!(
            hex,
            "0xd43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d"
        );
    }

    #[test]
    fn test_account_id_from_hex() {
        let input = "0xD43593C715FDD31C61141ABD04A99FD6822C8558854CCDE39A5684E7A56DA27D";
        assert_eq!(
            account_id_hex(input).unwrap(),
            "0xd43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d"
        );
    }

    #[test]
    fn test_account_id_rejects_garbage() {
        assert!(account_id_hex("not an address").is_err());
        assert!(account_id_hex("0x1234").is_err());
        // Alice with the last character altered
        assert!(account_id_hex("5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQZ").is_err());
    }
}
