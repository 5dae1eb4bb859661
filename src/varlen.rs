//! Arrays of strings and JSON objects
//!
//! Managed arrays hold their values directly. Native arrays encode every
//! element into a fixed-width slot: a little-endian `u32` byte count followed
//! by room for `max_bytes` bytes of payload. A zeroed slot decodes as the
//! default value.

use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};

use serde::ser::{Serialize, SerializeSeq, Serializer};
use serde_json::Value;

use crate::alloc::{select_storage, NativeBuffer, StorageMode};
use crate::error::{check_index, check_len, LargeArrayError, Result};
use crate::{Context, ElementKind};

const PREFIX: usize = std::mem::size_of::<u32>();

/// Default payload size of a native slot, in bytes.
pub const DEFAULT_MAX_BYTES: usize = 100;

mod private {
    pub trait Sealed {}
}

/// A value stored in a [`VarArray`].
pub trait VarElement:
    private::Sealed + Clone + Default + PartialEq + Debug + Serialize + Send + Sync + 'static
{
    /// Kind tag of arrays holding this type
    const KIND: ElementKind;

    /// Bytes written into a native slot.
    fn encode(&self) -> Result<Vec<u8>>;

    /// Reads back bytes produced by `encode`.
    fn decode(bytes: &[u8]) -> Self;
}

impl private::Sealed for String {}
impl VarElement for String {
    const KIND: ElementKind = ElementKind::String;

    fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.as_bytes().to_vec())
    }

    fn decode(bytes: &[u8]) -> Self {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

impl private::Sealed for Value {}
impl VarElement for Value {
    const KIND: ElementKind = ElementKind::Object;

    fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| LargeArrayError::invalid(e.to_string()))
    }

    fn decode(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(bytes).unwrap_or(Value::Null)
    }
}

/// Fixed-width byte slots in native memory.
struct Slots {
    buffer: NativeBuffer<u8>,
    max_bytes: usize,
}

impl Slots {
    fn allocate(ctx: &Context, len: usize, max_bytes: usize) -> Result<Self> {
        let size = max_bytes
            .checked_add(PREFIX)
            .and_then(|width| width.checked_mul(len))
            .filter(|&size| size <= isize::MAX as usize)
            .ok_or_else(|| {
                LargeArrayError::invalid(format!(
                    "{} slots of {} bytes do not fit in memory",
                    len, max_bytes
                ))
            })?;
        let layout = NativeBuffer::<u8>::layout(size)
            .ok_or_else(|| LargeArrayError::invalid("slot layout overflow"))?;
        Ok(Self {
            buffer: NativeBuffer::allocate(ctx, layout, true),
            max_bytes,
        })
    }

    fn width(&self) -> usize {
        PREFIX + self.max_bytes
    }

    fn read(&self, i: usize) -> &[u8] {
        let slot = &self.buffer.as_slice()[i * self.width()..(i + 1) * self.width()];
        let mut prefix = [0u8; PREFIX];
        prefix.copy_from_slice(&slot[..PREFIX]);
        let n = (u32::from_le_bytes(prefix) as usize).min(self.max_bytes);
        &slot[PREFIX..PREFIX + n]
    }

    fn fits(&self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.max_bytes {
            return Err(LargeArrayError::invalid(format!(
                "value of {} bytes exceeds the slot size of {}",
                bytes.len(),
                self.max_bytes
            )));
        }
        Ok(())
    }

    fn write(&mut self, i: usize, bytes: &[u8]) -> Result<()> {
        self.fits(bytes)?;
        let width = self.width();
        let slot = &mut self.buffer.as_mut_slice()[i * width..(i + 1) * width];
        slot[..PREFIX].copy_from_slice(&(bytes.len() as u32).to_le_bytes());
        slot[PREFIX..PREFIX + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

enum VarStorage<V> {
    Managed(Vec<V>),
    Native(Slots),
}

/// A fixed-length array of strings or JSON values.
///
/// Native storage needs an upper bound on the encoded size of an element,
/// given at construction. Values longer than that are rejected by the
/// setters. Managed arrays accept values of any size.
pub struct VarArray<V> {
    len: usize,
    constant: bool,
    storage: VarStorage<V>,
}

/// Array of strings
pub type StringArray = VarArray<String>;
/// Array of JSON values
pub type ObjectArray = VarArray<Value>;

impl<V: VarElement> VarArray<V> {
    /// Constructs an array of default values using the global context and
    /// [`DEFAULT_MAX_BYTES`] per native slot.
    pub fn new(len: usize) -> Result<Self> {
        Self::new_in(Context::global(), len, DEFAULT_MAX_BYTES)
    }

    /// Constructs an array of default values. `max_bytes` bounds the encoded
    /// size of each element if the array ends up in native storage.
    pub fn new_in(ctx: &Context, len: usize, max_bytes: usize) -> Result<Self> {
        check_len(len)?;
        let storage = match select_storage(ctx, len) {
            StorageMode::Managed => VarStorage::Managed(vec![V::default(); len]),
            StorageMode::Native => VarStorage::Native(Slots::allocate(ctx, len, max_bytes)?),
        };
        Ok(Self {
            len,
            constant: false,
            storage,
        })
    }

    /// Constructs a constant array.
    pub fn constant(len: usize, value: V) -> Result<Self> {
        check_len(len)?;
        Ok(Self {
            len,
            constant: true,
            storage: VarStorage::Managed(vec![value]),
        })
    }

    /// Takes ownership of `data` as managed storage.
    pub fn from_vec(data: Vec<V>) -> Result<Self> {
        check_len(data.len())?;
        Ok(Self {
            len: data.len(),
            constant: false,
            storage: VarStorage::Managed(data),
        })
    }

    /// Copies `data` into storage chosen by `ctx`.
    pub fn from_slice_in(ctx: &Context, data: &[V], max_bytes: usize) -> Result<Self> {
        Self::try_from_fn_in(ctx, data.len(), max_bytes, |i| Ok(data[i].clone()))
    }

    /// Constructs an array whose element `i` is `f(i)`, stopping at the
    /// first error.
    pub fn try_from_fn_in<F>(ctx: &Context, len: usize, max_bytes: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize) -> Result<V>,
    {
        check_len(len)?;
        match select_storage(ctx, len) {
            StorageMode::Managed => Self::from_vec((0..len).map(f).collect::<Result<_>>()?),
            StorageMode::Native => {
                let mut res = Self::new_in(ctx, len, max_bytes)?;
                for i in 0..len {
                    res.set(i, f(i)?)?;
                }
                Ok(res)
            }
        }
    }

    /// Kind of the elements
    pub fn kind(&self) -> ElementKind {
        V::KIND
    }

    /// Number of elements
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Bytes per element as recorded by the kind
    pub fn element_width(&self) -> usize {
        V::KIND.width()
    }

    /// Returns `true` for arrays built with [`VarArray::constant`].
    pub fn is_constant(&self) -> bool {
        self.constant
    }

    /// Returns `true` if the elements live in native memory.
    pub fn is_large(&self) -> bool {
        matches!(self.storage, VarStorage::Native(_))
    }

    /// Where the elements live
    pub fn storage_mode(&self) -> StorageMode {
        match self.storage {
            VarStorage::Managed(_) => StorageMode::Managed,
            VarStorage::Native(_) => StorageMode::Native,
        }
    }

    /// Largest encoded element accepted by native storage, if native.
    pub fn max_bytes(&self) -> Option<usize> {
        match &self.storage {
            VarStorage::Managed(_) => None,
            VarStorage::Native(slots) => Some(slots.max_bytes),
        }
    }

    pub(crate) fn value(&self, i: usize) -> V {
        assert!(i < self.len);
        let i = if self.constant { 0 } else { i };
        match &self.storage {
            VarStorage::Managed(data) => data[i].clone(),
            VarStorage::Native(slots) => V::decode(slots.read(i)),
        }
    }

    /// Returns element `i`.
    pub fn get(&self, i: usize) -> Result<V> {
        check_index(i, self.len)?;
        Ok(self.value(i))
    }

    /// Returns element `i` without bounds checking.
    ///
    /// # Safety
    ///
    /// `i` must be less than `self.len()`.
    pub unsafe fn get_unchecked(&self, i: usize) -> V {
        let i = if self.constant { 0 } else { i };
        match &self.storage {
            VarStorage::Managed(data) => data.get_unchecked(i).clone(),
            VarStorage::Native(slots) => V::decode(slots.read(i)),
        }
    }

    /// Overwrites element `i`.
    pub fn set(&mut self, i: usize, value: V) -> Result<()> {
        if self.constant {
            return Err(LargeArrayError::AccessDenied);
        }
        check_index(i, self.len)?;
        match &mut self.storage {
            VarStorage::Managed(data) => data[i] = value,
            VarStorage::Native(slots) => slots.write(i, &value.encode()?)?,
        }
        Ok(())
    }

    /// Overwrites elements `pos..pos + values.len()`. Nothing is written
    /// unless every value fits the destination.
    pub(crate) fn set_range(&mut self, pos: usize, values: Vec<V>) -> Result<()> {
        if self.constant {
            return Err(LargeArrayError::AccessDenied);
        }
        if values.is_empty() {
            return Ok(());
        }
        let end = pos + values.len();
        if end > self.len {
            return Err(LargeArrayError::OutOfRange {
                index: end - 1,
                len: self.len,
            });
        }
        match &mut self.storage {
            VarStorage::Managed(data) => {
                for (slot, v) in data[pos..end].iter_mut().zip(values) {
                    *slot = v;
                }
            }
            VarStorage::Native(slots) => {
                let encoded = values.iter().map(V::encode).collect::<Result<Vec<_>>>()?;
                for bytes in &encoded {
                    slots.fits(bytes)?;
                }
                for (j, bytes) in encoded.iter().enumerate() {
                    slots.write(pos + j, bytes)?;
                }
            }
        }
        Ok(())
    }

    /// Iterates over every element.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = V> + '_ {
        (0..self.len).map(move |i| self.value(i))
    }

    /// Clones the array, choosing storage for the copy with `ctx`.
    ///
    /// Native copies of native arrays keep the source's slot size. Native
    /// copies of managed arrays get slots wide enough for the longest
    /// element, and at least [`DEFAULT_MAX_BYTES`].
    pub fn clone_in(&self, ctx: &Context) -> Result<Self> {
        if self.constant {
            return Self::constant(self.len, self.value(0));
        }
        match (select_storage(ctx, self.len), &self.storage) {
            (StorageMode::Managed, _) => Self::from_vec(self.iter().collect()),
            (StorageMode::Native, VarStorage::Native(src)) => {
                let mut res = Self::new_in(ctx, self.len, src.max_bytes)?;
                if let VarStorage::Native(dst) = &mut res.storage {
                    dst.buffer.as_mut_slice().copy_from_slice(src.buffer.as_slice());
                }
                Ok(res)
            }
            (StorageMode::Native, VarStorage::Managed(data)) => {
                let encoded = data.iter().map(V::encode).collect::<Result<Vec<_>>>()?;
                let longest = encoded.iter().map(Vec::len).max().unwrap_or(0);
                let mut res = Self::new_in(ctx, self.len, longest.max(DEFAULT_MAX_BYTES))?;
                if let VarStorage::Native(dst) = &mut res.storage {
                    for (i, bytes) in encoded.iter().enumerate() {
                        dst.write(i, bytes)?;
                    }
                }
                Ok(res)
            }
        }
    }
}

impl<V: VarElement> Clone for VarArray<V> {
    fn clone(&self) -> Self {
        match self.clone_in(Context::global()) {
            Ok(copy) => copy,
            Err(e) => panic!("cannot clone {} array: {}", V::KIND, e),
        }
    }
}

impl<V: VarElement> PartialEq for VarArray<V> {
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len || self.constant != other.constant {
            return false;
        }
        match (&self.storage, &other.storage) {
            (VarStorage::Managed(a), VarStorage::Managed(b)) => a == b,
            (VarStorage::Native(a), VarStorage::Native(b)) => a.buffer.same_memory(&b.buffer),
            _ => false,
        }
    }
}

impl<V: VarElement> Hash for VarArray<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        V::KIND.hash(state);
        self.len.hash(state);
        V::KIND.width().hash(state);
        self.constant.hash(state);
        if let VarStorage::Native(slots) = &self.storage {
            slots.buffer.as_ptr().hash(state);
        }
    }
}

impl<V: VarElement> Debug for VarArray<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        const SHOWN: usize = 16;
        let head: Vec<V> = self.iter().take(SHOWN).collect();
        f.debug_struct("VarArray")
            .field("kind", &V::KIND)
            .field("len", &self.len)
            .field("constant", &self.constant)
            .field("storage", &self.storage_mode())
            .field("head", &head)
            .finish()
    }
}

impl<V: VarElement> Serialize for VarArray<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len))?;
        for v in self.iter() {
            seq.serialize_element(&v)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn native_ctx() -> Context {
        Context::new().with_max_managed_len(4)
    }

    #[mockalloc::test]
    fn managed_strings() {
        let mut arr = StringArray::new(3).unwrap();
        assert!(!arr.is_large());
        assert_eq!(arr.get(1).unwrap(), "");
        arr.set(1, "a considerably longer string than any slot would hold".into())
            .unwrap();
        assert_eq!(arr.kind(), ElementKind::String);
        assert!(arr.get(3).is_err());
    }

    #[mockalloc::test]
    fn native_strings_respect_slot_size() {
        let ctx = native_ctx();
        let mut arr = StringArray::new_in(&ctx, 10, 8).unwrap();
        assert!(arr.is_large());
        assert_eq!(arr.max_bytes(), Some(8));
        assert_eq!(arr.get(9).unwrap(), "");
        arr.set(9, "héllo".into()).unwrap();
        assert_eq!(arr.get(9).unwrap(), "héllo");
        assert_eq!(unsafe { arr.get_unchecked(9) }, "héllo");
        arr.set(9, "".into()).unwrap();
        assert_eq!(arr.get(9).unwrap(), "");
        assert!(matches!(
            arr.set(0, "too long for eight".into()),
            Err(LargeArrayError::InvalidArgument(_))
        ));
    }

    #[mockalloc::test]
    fn native_objects_round_trip() {
        let ctx = native_ctx();
        let mut arr = ObjectArray::new_in(&ctx, 6, 64).unwrap();
        assert_eq!(arr.get(0).unwrap(), Value::Null);
        let value = json!({"name": "probe", "values": [1, 2, 3]});
        arr.set(2, value.clone()).unwrap();
        assert_eq!(arr.get(2).unwrap(), value);
        assert_eq!(arr.kind(), ElementKind::Object);
    }

    #[mockalloc::test]
    fn constant_strings() {
        let mut arr = StringArray::constant(1000, "x".into()).unwrap();
        assert!(arr.is_constant());
        assert_eq!(arr.get(999).unwrap(), "x");
        assert_eq!(arr.set(0, "y".into()), Err(LargeArrayError::AccessDenied));
        assert_eq!(arr.clone(), arr);
    }

    #[mockalloc::test]
    fn clone_copies_slots() {
        let ctx = native_ctx();
        let data: Vec<String> = (0..7).map(|i| i.to_string()).collect();
        let arr = StringArray::from_slice_in(&ctx, &data, 4).unwrap();
        let copy = arr.clone_in(&ctx).unwrap();
        assert!(copy.is_large());
        assert_eq!(copy.max_bytes(), Some(4));
        assert_ne!(copy, arr);
        assert_eq!(copy.iter().collect::<Vec<_>>(), data);
    }

    #[mockalloc::test]
    fn clone_widens_slots_for_long_values() {
        let long = "x".repeat(200);
        let arr = StringArray::from_vec(vec![long.clone(); 6]).unwrap();
        let copy = arr.clone_in(&native_ctx()).unwrap();
        assert!(copy.is_large());
        assert_eq!(copy.max_bytes(), Some(200));
        assert_eq!(copy.get(0).unwrap(), long);
        assert_eq!(copy.get(5).unwrap(), long);

        let short = StringArray::from_vec(vec!["ab".to_string(); 6]).unwrap();
        assert_eq!(short.clone_in(&native_ctx()).unwrap().max_bytes(), Some(DEFAULT_MAX_BYTES));
    }

    #[mockalloc::test]
    fn set_range_writes_nothing_on_overflow() {
        let mut arr = StringArray::new_in(&native_ctx(), 6, 4).unwrap();
        let values = vec!["ab".to_string(), "too long".to_string()];
        assert!(matches!(arr.set_range(1, values), Err(LargeArrayError::InvalidArgument(_))));
        assert_eq!(arr.get(1).unwrap(), "");
        arr.set_range(4, vec!["cd".into(), "ef".into()]).unwrap();
        assert_eq!(arr.iter().collect::<Vec<_>>(), vec!["", "", "", "", "cd", "ef"]);
        assert!(arr.set_range(5, vec!["a".into(), "b".into()]).is_err());
    }

    #[mockalloc::test]
    fn serializes_as_sequence() {
        let arr = ObjectArray::from_vec(vec![json!(1), json!("two")]).unwrap();
        assert_eq!(serde_json::to_string(&arr).unwrap(), r#"[1,"two"]"#);
    }
}
