//! Variable storage: symbol normalization, default typing, scalar slots.
//!
//! Only the first two alphanumeric characters of an identifier are
//! significant, so `COUNT` and `COLOR` alias the same slot `CO`. A trailing
//! `%` `!` `#` `$` names the type explicitly; otherwise the leading letter
//! is looked up in the DEF default table (DEFINT/DEFSNG/DEFDBL/DEFSTR),
//! which starts out all-Single.

use std::collections::HashMap;
use std::fmt;

use crate::error::{BasicError, BasicResult};
use crate::strings::{StrDesc, StringRootProvider};
use crate::value::{ScalarType, Value};

/// Per-letter default scalar types, mutated by the DEFxxx statements.
#[derive(Debug, Clone)]
pub struct DefaultTypeTable {
    types: [ScalarType; 26],
}

impl Default for DefaultTypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultTypeTable {
    pub fn new() -> Self {
        DefaultTypeTable {
            types: [ScalarType::Single; 26],
        }
    }

    pub fn reset(&mut self) {
        self.types = [ScalarType::Single; 26];
    }

    /// Apply `DEFxxx from-to` to an inclusive letter range.
    pub fn set_range(&mut self, from: char, to: char, ty: ScalarType) {
        let mut lo = from.to_ascii_uppercase();
        let mut hi = to.to_ascii_uppercase();
        if lo > hi {
            std::mem::swap(&mut lo, &mut hi);
        }
        for c in lo..=hi {
            if c.is_ascii_uppercase() {
                self.types[c as usize - 'A' as usize] = ty;
            }
        }
    }

    pub fn default_for(&self, leading: char) -> ScalarType {
        let c = leading.to_ascii_uppercase();
        if c.is_ascii_uppercase() {
            self.types[c as usize - 'A' as usize]
        } else {
            ScalarType::Single
        }
    }
}

/// Normalized symbol key: at most two significant characters plus the type
/// suffix. Distinct suffixes on the same name are distinct variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolKey {
    pub name: String,
    pub suffix: Option<char>,
}

impl SymbolKey {
    /// Normalize a raw identifier: trim whitespace, strip the suffix,
    /// uppercase, and keep the first two alphanumeric characters.
    pub fn normalize(raw: &str) -> SymbolKey {
        let trimmed = raw.trim();
        let (body, suffix) = match trimmed.chars().last() {
            Some(c @ ('%' | '!' | '#' | '$')) => (&trimmed[..trimmed.len() - 1], Some(c)),
            _ => (trimmed, None),
        };
        let mut name = String::with_capacity(2);
        for c in body.chars() {
            if c.is_ascii_alphanumeric() {
                name.push(c.to_ascii_uppercase());
                if name.len() == 2 {
                    break;
                }
            }
        }
        SymbolKey { name, suffix }
    }

    /// Resolved type: suffix wins, then the default table on the first
    /// letter.
    pub fn resolved_type(&self, deftbl: &DefaultTypeTable) -> ScalarType {
        if let Some(suffix) = self.suffix {
            if let Some(ty) = ScalarType::from_suffix(suffix) {
                return ty;
            }
        }
        deftbl.default_for(self.name.chars().next().unwrap_or('A'))
    }
}

impl fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(suffix) = self.suffix {
            write!(f, "{}", suffix)?;
        }
        Ok(())
    }
}

/// A slot is a scalar or a marker pointing at an array, never both.
#[derive(Debug, Clone)]
pub enum VarSlot {
    Scalar(Value),
    Array(String),
}

#[derive(Debug, Default)]
pub struct VariableTable {
    deftbl: DefaultTypeTable,
    table: HashMap<SymbolKey, VarSlot>,
}

impl VariableTable {
    pub fn new() -> Self {
        VariableTable {
            deftbl: DefaultTypeTable::new(),
            table: HashMap::new(),
        }
    }

    pub fn deftbl(&self) -> &DefaultTypeTable {
        &self.deftbl
    }

    pub fn deftbl_mut(&mut self) -> &mut DefaultTypeTable {
        &mut self.deftbl
    }

    /// Resolve or create a scalar slot; fresh slots get the zero value of
    /// their resolved type. An array slot under the same key is a type
    /// mismatch.
    pub fn get_or_create(&mut self, raw: &str) -> BasicResult<&mut Value> {
        let key = SymbolKey::normalize(raw);
        let ty = key.resolved_type(&self.deftbl);
        let slot = self
            .table
            .entry(key)
            .or_insert_with(|| VarSlot::Scalar(Value::default_for(ty)));
        match slot {
            VarSlot::Scalar(value) => Ok(value),
            VarSlot::Array(_) => Err(BasicError::TypeMismatch),
        }
    }

    /// Read-only lookup, no slot creation.
    pub fn try_get(&self, raw: &str) -> Option<&VarSlot> {
        self.table.get(&SymbolKey::normalize(raw))
    }

    /// Current scalar value, if the slot exists and is scalar.
    pub fn get_value(&self, raw: &str) -> Option<Value> {
        match self.try_get(raw) {
            Some(VarSlot::Scalar(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Store a value whose tag already matches the slot type.
    pub fn assign(&mut self, raw: &str, value: Value) -> BasicResult<()> {
        let slot = self.get_or_create(raw)?;
        if slot.scalar_type() != value.scalar_type() {
            return Err(BasicError::TypeMismatch);
        }
        *slot = value;
        Ok(())
    }

    /// Store a value, converting between numeric types to match the slot.
    /// String/numeric crossings are still a mismatch.
    pub fn assign_coerced(
        &mut self,
        raw: &str,
        value: Value,
        mode: crate::value::OverflowMode,
    ) -> BasicResult<()> {
        let slot = self.get_or_create(raw)?;
        let coerced = value.coerce_numeric(slot.scalar_type(), mode)?;
        *slot = coerced;
        Ok(())
    }

    /// Store a heap descriptor into a string-typed slot.
    pub fn assign_string(&mut self, raw: &str, desc: StrDesc) -> BasicResult<()> {
        let slot = self.get_or_create(raw)?;
        match slot {
            Value::Str(_) => {
                *slot = Value::Str(desc);
                Ok(())
            }
            _ => Err(BasicError::TypeMismatch),
        }
    }

    /// Claim the key for an array; fails on any existing slot.
    pub fn mark_array(&mut self, raw: &str, array_name: String) -> BasicResult<()> {
        let key = SymbolKey::normalize(raw);
        if self.table.contains_key(&key) {
            return Err(BasicError::RedimensionedArray);
        }
        self.table.insert(key, VarSlot::Array(array_name));
        Ok(())
    }

    pub fn is_array(&self, raw: &str) -> bool {
        matches!(self.try_get(raw), Some(VarSlot::Array(_)))
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl StringRootProvider for VariableTable {
    fn collect_string_roots(&self, roots: &mut Vec<StrDesc>) {
        for slot in self.table.values() {
            if let VarSlot::Scalar(Value::Str(desc)) = slot {
                roots.push(desc.clone());
            }
            // String array elements are rooted by the array manager.
        }
    }
}
