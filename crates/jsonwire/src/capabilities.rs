//! A bag of named settings that travels as a plain JSON object.
use crate::{Coercible, Map, TypeDescriptor, Value, coerce};

/// Named capabilities, such as those a client negotiates with a remote end.
///
/// Serialized as the bare object of its entries, in insertion order, with no
/// `class` property.
///
/// ```
/// use jsonwire::{Capabilities, Json};
///
/// let mut caps = Capabilities::new();
/// caps.set("browserName", "firefox");
/// caps.set("acceptInsecureCerts", true);
///
/// let json = Json::new();
/// let text = json.to_json(&caps)?;
/// assert_eq!(text, r#"{"browserName":"firefox","acceptInsecureCerts":true}"#);
/// let back: Capabilities = json.to_type(&text)?.unwrap();
/// assert_eq!(back, caps);
/// # Ok::<(), jsonwire::JsonError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities(Map);

impl Capabilities {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a capability. Setting `null` removes it.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        match value.into() {
            Value::Null => {
                self.0.shift_remove(&name);
            }
            value => {
                self.0.insert(name, value);
            }
        }
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    #[must_use]
    pub fn browser_name(&self) -> Option<&str> {
        self.get("browserName").and_then(Value::as_str)
    }

    /// Adds every capability of `other`, overriding existing ones.
    #[must_use]
    pub fn merge(mut self, other: &Capabilities) -> Self {
        for (name, value) in &other.0 {
            self.set(name.clone(), value.clone());
        }
        self
    }

    #[must_use]
    pub fn as_map(&self) -> &Map {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map> for Capabilities {
    fn from(map: Map) -> Self {
        let mut caps = Self::new();
        for (name, value) in map {
            caps.set(name, value);
        }
        caps
    }
}

impl Coercible for Capabilities {
    fn descriptor() -> TypeDescriptor {
        coerce::exact::<Self>("Capabilities", |map| Ok(Self::from(map)), |caps| caps.0.clone())
    }
}
