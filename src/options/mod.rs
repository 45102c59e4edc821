//! Tri-state command-line options and the wkhtmltoimage option schema
//!
//! Every option is an [`Opt`], which is either unset or holds a value. Unset
//! options contribute nothing to the command line, so a default-constructed
//! [`ImageOptions`] serializes to an empty argument list.

pub mod image;

pub use image::ImageOptions;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Prefix shared by every long option token
pub const FLAG_PREFIX: &str = "--";

/// A setting that is either unset or holds a concrete value.
///
/// ```
/// use wkimage::options::Opt;
///
/// let mut quality: Opt<u32> = Opt::Unset;
/// assert_eq!(quality.get(), 0);
/// quality.set(90);
/// assert_eq!(quality.value(), Some(&90));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Opt<T> {
    Unset,
    Value(T),
}

impl<T> Default for Opt<T> {
    fn default() -> Self {
        Opt::Unset
    }
}

impl<T> Opt<T> {
    /// Replace the current state with `value`
    pub fn set(&mut self, value: T) {
        *self = Opt::Value(value);
    }

    /// Return to the unset state
    pub fn clear(&mut self) {
        *self = Opt::Unset;
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Opt::Value(_))
    }

    pub fn is_unset(&self) -> bool {
        !self.is_set()
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Opt::Unset => None,
            Opt::Value(v) => Some(v),
        }
    }

    /// Current value, or the type's default when unset
    pub fn get(&self) -> T
    where
        T: Default + Clone,
    {
        self.value().cloned().unwrap_or_default()
    }

    /// Append this option's tokens for `flag` (without the `--` prefix)
    pub fn push_args(&self, flag: &str, out: &mut Vec<String>)
    where
        T: ArgValue,
    {
        if let Opt::Value(v) = self {
            v.push_args(flag, out);
        }
    }
}

impl<T> Opt<Vec<T>> {
    /// Append an entry to a repeatable option, creating the list when unset
    pub fn push(&mut self, item: T) {
        match self {
            Opt::Value(items) => items.push(item),
            Opt::Unset => *self = Opt::Value(vec![item]),
        }
    }
}

impl<T> From<Option<T>> for Opt<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Opt::Value(v),
            None => Opt::Unset,
        }
    }
}

impl<T: Serialize> Serialize for Opt<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Opt<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Opt::from)
    }
}

/// How a value renders itself onto the command line
pub trait ArgValue {
    fn push_args(&self, flag: &str, out: &mut Vec<String>);
}

fn flag_token(flag: &str) -> String {
    format!("{}{}", FLAG_PREFIX, flag)
}

// Booleans are switches: present when true, absent when false.
impl ArgValue for bool {
    fn push_args(&self, flag: &str, out: &mut Vec<String>) {
        if *self {
            out.push(flag_token(flag));
        }
    }
}

impl ArgValue for String {
    fn push_args(&self, flag: &str, out: &mut Vec<String>) {
        out.push(flag_token(flag));
        out.push(self.clone());
    }
}

impl ArgValue for u32 {
    fn push_args(&self, flag: &str, out: &mut Vec<String>) {
        out.push(flag_token(flag));
        out.push(self.to_string());
    }
}

impl ArgValue for f64 {
    fn push_args(&self, flag: &str, out: &mut Vec<String>) {
        out.push(flag_token(flag));
        out.push(self.to_string());
    }
}

/// Repeated single-valued option: `--flag v` per entry
impl ArgValue for Vec<String> {
    fn push_args(&self, flag: &str, out: &mut Vec<String>) {
        for item in self {
            item.push_args(flag, out);
        }
    }
}

/// Repeated key-value option: `--flag key value` per entry, in insertion order
impl ArgValue for Vec<(String, String)> {
    fn push_args(&self, flag: &str, out: &mut Vec<String>) {
        for (key, value) in self {
            out.push(flag_token(flag));
            out.push(key.clone());
            out.push(value.clone());
        }
    }
}
