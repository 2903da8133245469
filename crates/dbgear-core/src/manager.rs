//! Name-keyed, insertion-ordered entity registries.
//!
//! Every named collection of the model goes through [`Manager`], so adding,
//! removing and looking up entities reports the same error kinds everywhere.

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{Error, Result};

/// An entity that can be registered in a [`Manager`].
pub trait Named {
    /// Human readable kind used in error messages (`"table"`, `"column"`, ...).
    const KIND: &'static str;

    /// Registry key of the entity.
    fn key(&self) -> Cow<'_, str>;

    /// Called when the entity is read from a keyed YAML mapping whose key
    /// is authoritative for the name.
    fn assign_key(&mut self, _key: &str) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manager<T> {
    items: IndexMap<String, T>,
}

impl<T> Default for Manager<T> {
    fn default() -> Self {
        Self {
            items: IndexMap::new(),
        }
    }
}

impl<T: Named> Manager<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `item`, failing with `EntityExists` when its key is taken.
    pub fn add(&mut self, item: T) -> Result<&mut T> {
        let key = item.key().into_owned();
        if self.items.contains_key(&key) {
            return Err(Error::exists(T::KIND, key));
        }
        let (index, _) = self.items.insert_full(key, item);
        Ok(&mut self.items[index])
    }

    /// Remove and return the entity named `name`, keeping the order of the rest.
    pub fn remove(&mut self, name: &str) -> Result<T> {
        self.items
            .shift_remove(name)
            .ok_or_else(|| Error::not_found(T::KIND, name))
    }

    /// Replace an existing entity with an updated version of itself.
    pub fn update(&mut self, item: T) -> Result<()> {
        let key = item.key().into_owned();
        match self.items.get_mut(&key) {
            Some(slot) => {
                *slot = item;
                Ok(())
            }
            None => Err(Error::not_found(T::KIND, key)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.items.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.items.get_mut(name)
    }

    /// Like [`Manager::get`] but reports a missing entity as `EntityNotFound`.
    pub fn require(&self, name: &str) -> Result<&T> {
        self.items
            .get(name)
            .ok_or_else(|| Error::not_found(T::KIND, name))
    }

    pub fn require_mut(&mut self, name: &str) -> Result<&mut T> {
        self.items
            .get_mut(name)
            .ok_or_else(|| Error::not_found(T::KIND, name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.values_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first().map(|(_, item)| item)
    }

    /// Build a manager from a sequence, rejecting duplicate keys.
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Result<Self> {
        let mut manager = Self::new();
        for item in items {
            manager.add(item)?;
        }
        Ok(manager)
    }
}

impl<'a, T> IntoIterator for &'a Manager<T> {
    type Item = &'a T;
    type IntoIter = indexmap::map::Values<'a, String, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.values()
    }
}

impl<T: Named + Serialize> Serialize for Manager<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.items.len()))?;
        for (key, item) in &self.items {
            map.serialize_entry(key, item)?;
        }
        map.end()
    }
}

impl<'de, T: Named + Deserialize<'de>> Deserialize<'de> for Manager<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct KeyedVisitor<T>(PhantomData<T>);

        impl<'de, T: Named + Deserialize<'de>> Visitor<'de> for KeyedVisitor<T> {
            type Value = Manager<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a mapping of {} names to definitions", T::KIND)
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
                Ok(Manager::new())
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut manager = Manager::new();
                while let Some((key, mut item)) = access.next_entry::<String, T>()? {
                    item.assign_key(&key);
                    if item.key() != key.as_str() {
                        return Err(de::Error::custom(format!(
                            "{} key {key} does not match its name {}",
                            T::KIND,
                            item.key()
                        )));
                    }
                    manager.add(item).map_err(de::Error::custom)?;
                }
                Ok(manager)
            }
        }

        deserializer.deserialize_any(KeyedVisitor(PhantomData))
    }
}

/// Serde adapter storing a [`Manager`] as a YAML sequence instead of a mapping.
///
/// Used for positional collections such as columns and indexes.
pub mod as_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{Manager, Named};

    pub fn serialize<T, S>(manager: &Manager<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Named + Serialize,
        S: Serializer,
    {
        serializer.collect_seq(manager.iter())
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Manager<T>, D::Error>
    where
        T: Named + Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let items = Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default();
        Manager::from_items(items).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Widget {
        #[serde(default)]
        name: String,
        size: u32,
    }

    impl Named for Widget {
        const KIND: &'static str = "widget";

        fn key(&self) -> Cow<'_, str> {
            Cow::Borrowed(&self.name)
        }

        fn assign_key(&mut self, key: &str) {
            if self.name.is_empty() {
                self.name = key.to_string();
            }
        }
    }

    fn widget(name: &str) -> Widget {
        Widget {
            name: name.to_string(),
            size: 1,
        }
    }

    #[test]
    fn add_rejects_duplicates() {
        let mut manager = Manager::new();
        manager.add(widget("a")).expect("first add");
        let err = manager.add(widget("a")).expect_err("duplicate add");
        assert_eq!(err.kind(), ErrorKind::EntityExists);
        assert_eq!(manager.len(), 1);
        assert!(manager.contains("a"));
        assert_eq!(manager.iter().filter(|item| item.name == "a").count(), 1);
    }

    #[test]
    fn remove_preserves_order_and_reports_missing() {
        let mut manager =
            Manager::from_items(vec![widget("a"), widget("b"), widget("c")]).expect("build");
        manager.remove("b").expect("remove");
        assert_eq!(manager.names().collect::<Vec<_>>(), vec!["a", "c"]);
        let err = manager.remove("b").expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::EntityNotFound);
    }

    #[test]
    fn update_requires_existing_entity() {
        let mut manager = Manager::new();
        let err = manager.update(widget("x")).expect_err("absent");
        assert_eq!(err.kind(), ErrorKind::EntityNotFound);

        manager.add(widget("x")).expect("add");
        let mut bigger = widget("x");
        bigger.size = 7;
        manager.update(bigger).expect("update");
        assert_eq!(manager.get("x").map(|item| item.size), Some(7));
    }

    #[test]
    fn keyed_mapping_assigns_names() {
        let manager: Manager<Widget> =
            serde_yaml::from_str("first:\n  size: 2\nsecond:\n  size: 3\n").expect("parse");
        assert_eq!(manager.names().collect::<Vec<_>>(), vec!["first", "second"]);
        assert_eq!(manager.require("second").expect("second").name, "second");
    }

    #[test]
    fn list_form_rejects_duplicate_names() {
        #[derive(serde::Deserialize)]
        struct Holder {
            #[serde(with = "as_list")]
            widgets: Manager<Widget>,
        }

        let result: std::result::Result<Holder, _> = serde_yaml::from_str(
            "widgets:\n  - name: a\n    size: 1\n  - name: a\n    size: 2\n",
        );
        let err = result.err().expect("duplicate rejected");
        assert!(err.to_string().contains("widget already exists: a"));
    }
}
