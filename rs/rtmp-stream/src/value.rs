use std::fmt;

use serde::Serialize;

/// A loosely typed argument carried by command and data messages.
///
/// This mirrors the AMF data model closely enough for the session to build its messages;
/// serializing to the wire is left to the transport.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
	Null,
	Bool(bool),
	Number(f64),
	String(String),
	Object(Object),
	Array(Vec<Value>),
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Self::Bool(v)
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Self::Number(v)
	}
}

impl From<u32> for Value {
	fn from(v: u32) -> Self {
		Self::Number(v as f64)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Self::String(v.to_string())
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Self::String(v)
	}
}

impl From<Object> for Value {
	fn from(v: Object) -> Self {
		Self::Object(v)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(v: Option<T>) -> Self {
		v.map(Into::into).unwrap_or(Self::Null)
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Null => write!(f, "null"),
			Self::Bool(v) => write!(f, "{v}"),
			Self::Number(v) => write!(f, "{v}"),
			Self::String(v) => write!(f, "{v:?}"),
			Self::Object(v) => write!(f, "{v}"),
			Self::Array(v) => {
				write!(f, "[")?;
				for (i, item) in v.iter().enumerate() {
					if i > 0 {
						write!(f, ",")?;
					}
					write!(f, "{item}")?;
				}
				write!(f, "]")
			}
		}
	}
}

/// An object with ordered properties; insertion order is preserved on the wire.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Object(Vec<(String, Value)>);

impl Object {
	pub fn new() -> Self {
		Self::default()
	}

	/// Set a property, replacing any existing value with the same key in place.
	pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
		let key = key.into();
		let value = value.into();

		match self.0.iter_mut().find(|(k, _)| *k == key) {
			Some(entry) => entry.1 = value,
			None => self.0.push((key, value)),
		}
	}

	pub fn with<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
		self.insert(key, value);
		self
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v))
	}
}

impl Serialize for Object {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		use serde::ser::SerializeMap;

		let mut map = serializer.serialize_map(Some(self.0.len()))?;
		for (k, v) in &self.0 {
			map.serialize_entry(k, v)?;
		}
		map.end()
	}
}

impl fmt::Display for Object {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{{")?;
		for (i, (k, v)) in self.0.iter().enumerate() {
			if i > 0 {
				write!(f, ",")?;
			}
			write!(f, "{k}:{v}")?;
		}
		write!(f, "}}")
	}
}
