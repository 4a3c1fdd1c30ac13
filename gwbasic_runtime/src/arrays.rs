//! Multi-dimensional arrays with contiguous typed storage.
//!
//! Strides are built right-to-left so the rightmost subscript varies
//! fastest. Numeric arrays start zeroed; string arrays start with every
//! element the empty descriptor, and every element descriptor of every
//! string array is a GC root.

use std::collections::HashMap;

use crate::error::{BasicError, BasicResult};
use crate::strings::{StrDesc, StringRootProvider};
use crate::value::{ScalarType, Value};
use crate::variables::SymbolKey;

/// Elements an array may hold before DIM is refused outright.
const MAX_ELEMENTS: u64 = 1 << 20;

/// One dimension: inclusive bounds plus the element stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dim {
    pub lb: i16,
    pub ub: i16,
    pub stride: u32,
}

/// Typed contiguous element storage.
#[derive(Debug, Clone)]
pub enum ArrayData {
    Int16(Vec<i16>),
    Single(Vec<f32>),
    Double(Vec<f64>),
    Str(Vec<StrDesc>),
}

impl ArrayData {
    fn with_len(ty: ScalarType, len: usize) -> ArrayData {
        match ty {
            ScalarType::Int16 => ArrayData::Int16(vec![0; len]),
            ScalarType::Single => ArrayData::Single(vec![0.0; len]),
            ScalarType::Double => ArrayData::Double(vec![0.0; len]),
            ScalarType::Str => {
                ArrayData::Str((0..len).map(|_| StrDesc::empty()).collect())
            }
        }
    }

    pub fn scalar_type(&self) -> ScalarType {
        match self {
            ArrayData::Int16(_) => ScalarType::Int16,
            ArrayData::Single(_) => ScalarType::Single,
            ArrayData::Double(_) => ScalarType::Double,
            ArrayData::Str(_) => ScalarType::Str,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BasicArray {
    dims: Vec<Dim>,
    count: u32,
    data: ArrayData,
}

impl BasicArray {
    /// Build an array over `[lb, ub_i]` per dimension.
    pub fn new(ty: ScalarType, lb: i16, upper_bounds: &[i16]) -> BasicResult<BasicArray> {
        if upper_bounds.is_empty() {
            return Err(BasicError::IllegalFunctionCall);
        }
        let mut dims: Vec<Dim> = upper_bounds
            .iter()
            .map(|&ub| {
                if ub < lb {
                    Err(BasicError::IllegalFunctionCall)
                } else {
                    Ok(Dim { lb, ub, stride: 0 })
                }
            })
            .collect::<BasicResult<_>>()?;

        // Rightmost index varies fastest.
        let mut stride: u64 = 1;
        for dim in dims.iter_mut().rev() {
            dim.stride = stride as u32;
            let extent = (dim.ub as i32 - dim.lb as i32 + 1) as u64;
            stride = stride.saturating_mul(extent);
            if stride > MAX_ELEMENTS {
                return Err(BasicError::OutOfMemory);
            }
        }

        Ok(BasicArray {
            dims,
            count: stride as u32,
            data: ArrayData::with_len(ty, stride as usize),
        })
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn elem_type(&self) -> ScalarType {
        self.data.scalar_type()
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn dims(&self) -> &[Dim] {
        &self.dims
    }

    /// Flat offset for a subscript vector, validating rank and bounds.
    pub fn flat_index(&self, subs: &[i32]) -> BasicResult<usize> {
        if subs.len() != self.dims.len() {
            return Err(BasicError::SubscriptOutOfRange);
        }
        let mut idx: u64 = 0;
        for (dim, &sub) in self.dims.iter().zip(subs) {
            if sub < dim.lb as i32 || sub > dim.ub as i32 {
                return Err(BasicError::SubscriptOutOfRange);
            }
            idx += (sub - dim.lb as i32) as u64 * dim.stride as u64;
        }
        if idx >= self.count as u64 {
            return Err(BasicError::SubscriptOutOfRange);
        }
        Ok(idx as usize)
    }

    pub fn get(&self, subs: &[i32]) -> BasicResult<Value> {
        let idx = self.flat_index(subs)?;
        Ok(match &self.data {
            ArrayData::Int16(v) => Value::Int16(v[idx]),
            ArrayData::Single(v) => Value::Single(v[idx]),
            ArrayData::Double(v) => Value::Double(v[idx]),
            ArrayData::Str(v) => Value::Str(v[idx].clone()),
        })
    }

    /// Store a value whose tag matches the element type exactly.
    pub fn set(&mut self, subs: &[i32], value: &Value) -> BasicResult<()> {
        let idx = self.flat_index(subs)?;
        match (&mut self.data, value) {
            (ArrayData::Int16(v), Value::Int16(x)) => v[idx] = *x,
            (ArrayData::Single(v), Value::Single(x)) => v[idx] = *x,
            (ArrayData::Double(v), Value::Double(x)) => v[idx] = *x,
            (ArrayData::Str(v), Value::Str(x)) => v[idx] = x.clone(),
            _ => return Err(BasicError::TypeMismatch),
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ArrayManager {
    arrays: HashMap<String, BasicArray>,
    option_base: i16,
    base_frozen: bool,
}

impl ArrayManager {
    pub fn new() -> Self {
        ArrayManager {
            arrays: HashMap::new(),
            option_base: 0,
            base_frozen: false,
        }
    }

    fn normalize(raw: &str) -> String {
        SymbolKey::normalize(raw).to_string()
    }

    /// OPTION BASE 0 or 1; the first DIM freezes it.
    pub fn set_option_base(&mut self, base: i16) -> BasicResult<()> {
        if !(0..=1).contains(&base) {
            return Err(BasicError::IllegalFunctionCall);
        }
        if self.base_frozen {
            return Err(BasicError::RedimensionedArray);
        }
        self.option_base = base;
        Ok(())
    }

    pub fn option_base(&self) -> i16 {
        self.option_base
    }

    /// DIM: create a fresh array. A second DIM of the same name is the
    /// dialect's duplicate-definition error.
    pub fn create_array(
        &mut self,
        raw: &str,
        ty: ScalarType,
        upper_bounds: &[i16],
    ) -> BasicResult<()> {
        let name = Self::normalize(raw);
        if self.arrays.contains_key(&name) {
            return Err(BasicError::RedimensionedArray);
        }
        let array = BasicArray::new(ty, self.option_base, upper_bounds)?;
        self.base_frozen = true;
        self.arrays.insert(name, array);
        Ok(())
    }

    pub fn exists(&self, raw: &str) -> bool {
        self.arrays.contains_key(&Self::normalize(raw))
    }

    pub fn get_element(&self, raw: &str, subs: &[i32]) -> BasicResult<Value> {
        self.lookup(raw)?.get(subs)
    }

    pub fn set_element(&mut self, raw: &str, subs: &[i32], value: &Value) -> BasicResult<()> {
        let name = Self::normalize(raw);
        match self.arrays.get_mut(&name) {
            Some(array) => array.set(subs, value),
            None => Err(BasicError::syntax(format!("Undefined array: {}", name), 0)),
        }
    }

    pub fn info(&self, raw: &str) -> Option<(ScalarType, usize, &[Dim])> {
        self.arrays
            .get(&Self::normalize(raw))
            .map(|a| (a.elem_type(), a.rank(), a.dims()))
    }

    fn lookup(&self, raw: &str) -> BasicResult<&BasicArray> {
        let name = Self::normalize(raw);
        self.arrays
            .get(&name)
            .ok_or_else(|| BasicError::syntax(format!("Undefined array: {}", name), 0))
    }

    /// ERASE all arrays; the option base thaws with them.
    pub fn clear(&mut self) {
        self.arrays.clear();
        self.base_frozen = false;
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }
}

impl StringRootProvider for ArrayManager {
    fn collect_string_roots(&self, roots: &mut Vec<StrDesc>) {
        for array in self.arrays.values() {
            if let ArrayData::Str(elements) = &array.data {
                roots.extend(elements.iter().cloned());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_one_dimension() {
        let mut mgr = ArrayManager::new();
        mgr.create_array("A", ScalarType::Single, &[10]).unwrap();
        mgr.set_element("A", &[5], &Value::Single(42.0)).unwrap();
        assert!(matches!(
            mgr.get_element("A", &[5]).unwrap(),
            Value::Single(v) if v == 42.0
        ));
    }

    #[test]
    fn test_subscript_out_of_range() {
        let mut mgr = ArrayManager::new();
        mgr.create_array("A", ScalarType::Int16, &[10]).unwrap();
        assert_eq!(
            mgr.get_element("A", &[11]).unwrap_err(),
            BasicError::SubscriptOutOfRange
        );
        assert_eq!(
            mgr.get_element("A", &[-1]).unwrap_err(),
            BasicError::SubscriptOutOfRange
        );
        assert_eq!(
            mgr.get_element("A", &[1, 1]).unwrap_err(),
            BasicError::SubscriptOutOfRange
        );
    }

    #[test]
    fn test_rightmost_index_varies_fastest() {
        let arr = BasicArray::new(ScalarType::Int16, 0, &[2, 3]).unwrap();
        assert_eq!(arr.flat_index(&[0, 0]).unwrap(), 0);
        assert_eq!(arr.flat_index(&[0, 1]).unwrap(), 1);
        assert_eq!(arr.flat_index(&[1, 0]).unwrap(), 4);
        assert_eq!(arr.flat_index(&[2, 3]).unwrap(), 11);
        assert_eq!(arr.count(), 12);
    }

    #[test]
    fn test_duplicate_dim_rejected() {
        let mut mgr = ArrayManager::new();
        mgr.create_array("B", ScalarType::Int16, &[4]).unwrap();
        assert_eq!(
            mgr.create_array("B", ScalarType::Int16, &[4]).unwrap_err(),
            BasicError::RedimensionedArray
        );
    }

    #[test]
    fn test_option_base_frozen_by_first_dim() {
        let mut mgr = ArrayManager::new();
        mgr.set_option_base(1).unwrap();
        mgr.create_array("A", ScalarType::Single, &[3]).unwrap();
        assert_eq!(
            mgr.set_option_base(0).unwrap_err(),
            BasicError::RedimensionedArray
        );
        // Base 1 means subscript 0 is out of range.
        assert_eq!(
            mgr.get_element("A", &[0]).unwrap_err(),
            BasicError::SubscriptOutOfRange
        );
        assert!(mgr.get_element("A", &[1]).is_ok());
    }

    #[test]
    fn test_exact_type_enforced_on_set() {
        let mut mgr = ArrayManager::new();
        mgr.create_array("N%", ScalarType::Int16, &[3]).unwrap();
        assert_eq!(
            mgr.set_element("N%", &[0], &Value::Double(1.5)).unwrap_err(),
            BasicError::TypeMismatch
        );
    }

    #[test]
    fn test_name_normalization_aliases() {
        let mut mgr = ArrayManager::new();
        mgr.create_array("TABLE", ScalarType::Single, &[5]).unwrap();
        assert!(mgr.exists("TAX"));
        mgr.set_element("TABLE", &[2], &Value::Single(7.0)).unwrap();
        assert!(matches!(
            mgr.get_element("TAX", &[2]).unwrap(),
            Value::Single(v) if v == 7.0
        ));
    }

    #[test]
    fn test_string_array_roots() {
        let mut mgr = ArrayManager::new();
        mgr.create_array("S$", ScalarType::Str, &[2]).unwrap();
        let mut roots = Vec::new();
        mgr.collect_string_roots(&mut roots);
        assert_eq!(roots.len(), 3);
    }
}
