//! Collection appliers.
//!
//! Pure, infallible mutations applied when an operation succeeds. Lookups are
//! by [`Entity::id`]; a missing id makes update and delete a no-op.

use crate::types::{Product, ProductId, RawMaterial, RawMaterialId};

/// An element of a mirrored collection
pub trait Entity {
    /// Identifier type
    type Id: PartialEq;

    /// The server-assigned identifier
    fn id(&self) -> &Self::Id;
}

impl Entity for RawMaterial {
    type Id = RawMaterialId;

    fn id(&self) -> &RawMaterialId {
        &self.id
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &ProductId {
        &self.id
    }
}

/// Replace the collection wholesale with the server list
pub fn apply_fetch<T>(collection: &mut Vec<T>, server_list: Vec<T>) {
    *collection = server_list;
}

/// Append a created entity (no re-sort, no dedupe)
pub fn apply_create<T>(collection: &mut Vec<T>, created: T) {
    collection.push(created);
}

/// Replace the element whose id is `id`
///
/// Returns `false` if no element matched.
pub fn apply_update<T: Entity>(collection: &mut [T], id: &T::Id, updated: T) -> bool {
    match collection.iter_mut().find(|entity| entity.id() == id) {
        Some(slot) => {
            *slot = updated;
            true
        },
        None => false,
    }
}

/// Remove the element whose id is `id`
///
/// Returns `false` if no element matched.
pub fn apply_delete<T: Entity>(collection: &mut Vec<T>, id: &T::Id) -> bool {
    let before = collection.len();
    collection.retain(|entity| entity.id() != id);
    collection.len() != before
}

/// Find an element by id
#[must_use]
pub fn find<'a, T: Entity>(collection: &'a [T], id: &T::Id) -> Option<&'a T> {
    collection.iter().find(|entity| entity.id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn material(id: &str, stock: f64) -> RawMaterial {
        RawMaterial {
            id: RawMaterialId::new(id),
            name: format!("material-{id}"),
            stock_quantity: stock,
        }
    }

    #[test]
    fn create_appends_without_dedupe() {
        let mut collection = vec![material("1", 1.0)];
        apply_create(&mut collection, material("1", 2.0));
        assert_eq!(collection.len(), 2);
        assert_eq!(collection[1].stock_quantity, 2.0);
    }

    #[test]
    fn update_replaces_whole_element() {
        let mut collection = vec![material("1", 1.0), material("2", 2.0)];
        let mut renamed = material("2", 9.0);
        renamed.name = "Copper".to_string();

        assert!(apply_update(&mut collection, &RawMaterialId::new("2"), renamed.clone()));
        assert_eq!(collection[1], renamed);
        assert_eq!(collection[0], material("1", 1.0));
    }

    #[test]
    fn update_of_absent_id_is_noop() {
        let mut collection = vec![material("1", 1.0)];
        let before = collection.clone();
        assert!(!apply_update(&mut collection, &RawMaterialId::new("9"), material("9", 0.0)));
        assert_eq!(collection, before);
    }

    #[test]
    fn delete_twice_is_noop_the_second_time() {
        let mut collection = vec![material("1", 1.0), material("2", 2.0)];
        let id = RawMaterialId::new("1");

        assert!(apply_delete(&mut collection, &id));
        let after_first = collection.clone();
        assert!(!apply_delete(&mut collection, &id));
        assert_eq!(collection, after_first);
        assert!(find(&collection, &id).is_none());
    }

    fn collection() -> impl Strategy<Value = Vec<RawMaterial>> {
        proptest::collection::vec((0u8..20, 0.0f64..100.0), 0..12).prop_map(|rows| {
            rows.into_iter()
                .map(|(id, stock)| material(&id.to_string(), stock))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn fetch_is_idempotent(initial in collection(), server in collection()) {
            let mut once = initial.clone();
            apply_fetch(&mut once, server.clone());
            let mut twice = once.clone();
            apply_fetch(&mut twice, server.clone());
            prop_assert_eq!(&once, &server);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn delete_is_idempotent(mut items in collection(), id in 0u8..20) {
            let id = RawMaterialId::new(id.to_string());
            apply_delete(&mut items, &id);
            let once = items.clone();
            prop_assert!(!apply_delete(&mut items, &id));
            prop_assert_eq!(items, once);
        }

        #[test]
        fn update_never_changes_length(mut items in collection(), id in 0u8..20, stock in 0.0f64..10.0) {
            let before = items.len();
            let id = RawMaterialId::new(id.to_string());
            apply_update(&mut items, &id, material(id.as_str(), stock));
            prop_assert_eq!(items.len(), before);
        }
    }
}
