//! Change observation for exposed objects
//!
//! Models that want their mutations mirrored on the remote side embed an
//! `Arc<ChangeNotifier>` and report every attribute write through it. Whole
//! value replacements and in-place collection mutations are distinguished;
//! the latter carry the attribute name with the `_items` suffix.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::host::{HostError, HostValue, ListModel};

/// Suffix marking a collection mutation of the named attribute
pub const ITEMS_SUFFIX: &str = "_items";

// ─────────────────────────────────────────────────────────────────────────────
// Change Events
// ─────────────────────────────────────────────────────────────────────────────

/// What happened to an attribute
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeKind {
    /// The attribute was assigned a new value
    Replaced { old: HostValue, new: HostValue },
    /// Items of a sequence attribute were replaced in place
    Items {
        index: usize,
        removed: Vec<HostValue>,
        added: Vec<HostValue>,
    },
}

/// A mutation reported by an observable object
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeChange {
    /// Attribute name as reported (suffixed for collection mutations)
    pub name: String,
    pub kind: ChangeKind,
}

impl AttributeChange {
    /// A whole value replacement
    pub fn replaced(name: impl Into<String>, old: HostValue, new: HostValue) -> Self {
        Self {
            name: name.into(),
            kind: ChangeKind::Replaced { old, new },
        }
    }

    /// An in-place mutation of the sequence attribute `attribute`
    pub fn items(
        attribute: &str,
        index: usize,
        removed: Vec<HostValue>,
        added: Vec<HostValue>,
    ) -> Self {
        Self {
            name: format!("{attribute}{ITEMS_SUFFIX}"),
            kind: ChangeKind::Items {
                index,
                removed,
                added,
            },
        }
    }

    /// Whether this is a collection mutation rather than a replacement
    pub fn is_items(&self) -> bool {
        matches!(self.kind, ChangeKind::Items { .. })
    }

    /// The attribute the change belongs to, without the items suffix
    pub fn base_name(&self) -> &str {
        if self.is_items() {
            self.name.strip_suffix(ITEMS_SUFFIX).unwrap_or(&self.name)
        } else {
            &self.name
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Observable Capability
// ─────────────────────────────────────────────────────────────────────────────

/// Identifies one listener registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Callback invoked for every change
pub type ChangeListener = Arc<dyn Fn(&AttributeChange) + Send + Sync>;

/// An object that can notify listeners when its attributes change
pub trait Observable: Send + Sync {
    /// Register a listener
    fn subscribe(&self, listener: ChangeListener) -> SubscriptionId;

    /// Remove a listener; returns whether it was registered
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// Listener list shared by a model and the lists it owns
///
/// Delivery is synchronous, from the thread performing the mutation, in
/// subscription order. Callers must not hold their own locks while
/// notifying: listeners may read the object back.
#[derive(Default)]
pub struct ChangeNotifier {
    listeners: Mutex<Vec<(SubscriptionId, ChangeListener)>>,
    next_id: AtomicU64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a notifier wrapped in an Arc
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Deliver a change to every listener
    pub fn notify(&self, change: AttributeChange) {
        let listeners: Vec<ChangeListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener(&change);
        }
    }

    /// Report a whole value replacement
    pub fn notify_replaced(&self, name: &str, old: HostValue, new: HostValue) {
        self.notify(AttributeChange::replaced(name, old, new));
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl Observable for ChangeNotifier {
    fn subscribe(&self, listener: ChangeListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(sub, _)| *sub != id);
        listeners.len() != before
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Observable List
// ─────────────────────────────────────────────────────────────────────────────

struct ListOwner {
    notifier: Weak<ChangeNotifier>,
    attribute: String,
}

/// A sequence attribute that reports in-place mutations to its owner
///
/// Bind it to the owning model's notifier with [`ObservableList::bind`]; every
/// mutation then raises an items change for that attribute.
#[derive(Default)]
pub struct ObservableList {
    items: RwLock<Vec<HostValue>>,
    owner: RwLock<Option<ListOwner>>,
}

impl ObservableList {
    pub fn new(items: Vec<HostValue>) -> Self {
        Self {
            items: RwLock::new(items),
            owner: RwLock::new(None),
        }
    }

    /// Create a list already bound to `attribute` of the notifier's owner
    pub fn bound(items: Vec<HostValue>, notifier: &Arc<ChangeNotifier>, attribute: &str) -> Arc<Self> {
        let list = Arc::new(Self::new(items));
        list.bind(notifier, attribute);
        list
    }

    /// Report future mutations as changes of `attribute` on the notifier's owner
    pub fn bind(&self, notifier: &Arc<ChangeNotifier>, attribute: &str) {
        *self.owner.write() = Some(ListOwner {
            notifier: Arc::downgrade(notifier),
            attribute: attribute.to_string(),
        });
    }

    /// Stop reporting mutations; used when the owner replaces this list
    pub fn unbind(&self) {
        *self.owner.write() = None;
    }

    /// Copy of the current items
    pub fn snapshot(&self) -> Vec<HostValue> {
        self.items.read().clone()
    }

    /// Append an item
    pub fn push(&self, value: HostValue) {
        let index = {
            let mut items = self.items.write();
            items.push(value.clone());
            items.len() - 1
        };
        self.notify_owner(index, Vec::new(), vec![value]);
    }

    /// Insert an item, clamping the position to the end
    pub fn insert(&self, index: usize, value: HostValue) {
        let index = {
            let mut items = self.items.write();
            let index = index.min(items.len());
            items.insert(index, value.clone());
            index
        };
        self.notify_owner(index, Vec::new(), vec![value]);
    }

    /// Remove and return the item at `index`
    pub fn remove(&self, index: usize) -> Result<HostValue, HostError> {
        let removed = {
            let mut items = self.items.write();
            if index >= items.len() {
                return Err(HostError::IndexOutOfRange {
                    index: index as i64,
                    len: items.len(),
                });
            }
            items.remove(index)
        };
        self.notify_owner(index, vec![removed.clone()], Vec::new());
        Ok(removed)
    }

    /// Remove every item
    pub fn clear(&self) {
        let removed = std::mem::take(&mut *self.items.write());
        if !removed.is_empty() {
            self.notify_owner(0, removed, Vec::new());
        }
    }

    fn notify_owner(&self, index: usize, removed: Vec<HostValue>, added: Vec<HostValue>) {
        let target = self
            .owner
            .read()
            .as_ref()
            .and_then(|owner| Some((owner.notifier.upgrade()?, owner.attribute.clone())));

        if let Some((notifier, attribute)) = target {
            notifier.notify(AttributeChange::items(&attribute, index, removed, added));
        }
    }
}

impl ListModel for ObservableList {
    fn len(&self) -> usize {
        self.items.read().len()
    }

    fn get_item(&self, index: usize) -> Result<HostValue, HostError> {
        let items = self.items.read();
        items.get(index).cloned().ok_or(HostError::IndexOutOfRange {
            index: index as i64,
            len: items.len(),
        })
    }

    fn set_item(&self, index: usize, value: HostValue) -> Result<(), HostError> {
        let old = {
            let mut items = self.items.write();
            let len = items.len();
            let slot = items.get_mut(index).ok_or(HostError::IndexOutOfRange {
                index: index as i64,
                len,
            })?;
            std::mem::replace(slot, value.clone())
        };
        self.notify_owner(index, vec![old], vec![value]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(notifier: &ChangeNotifier) -> (SubscriptionId, Arc<Mutex<Vec<AttributeChange>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = notifier.subscribe(Arc::new(move |change: &AttributeChange| {
            sink.lock().push(change.clone());
        }));
        (id, seen)
    }

    #[test]
    fn test_items_change_base_name() {
        let change = AttributeChange::items("friends", 0, Vec::new(), vec![HostValue::from(1)]);
        assert_eq!(change.name, "friends_items");
        assert_eq!(change.base_name(), "friends");
    }

    #[test]
    fn test_replaced_base_name_untouched() {
        // A plain attribute may legitimately end in the suffix.
        let change = AttributeChange::replaced("line_items", HostValue::Null, HostValue::from(1));
        assert_eq!(change.base_name(), "line_items");
    }

    #[test]
    fn test_notify_and_unsubscribe() {
        let notifier = ChangeNotifier::new();
        let (id, seen) = recorder(&notifier);

        notifier.notify_replaced("x", HostValue::from(1), HostValue::from(2));
        assert_eq!(seen.lock().len(), 1);

        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.notify_replaced("x", HostValue::from(2), HostValue::from(3));
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(notifier.listener_count(), 0);
    }

    #[test]
    fn test_bound_list_reports_to_owner() {
        let notifier = ChangeNotifier::new_shared();
        let (_, seen) = recorder(&notifier);
        let list = ObservableList::bound(Vec::new(), &notifier, "items");

        list.push(HostValue::from("a"));
        list.set_item(0, HostValue::from("b")).unwrap();
        list.remove(0).unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|c| c.name == "items_items" && c.base_name() == "items"));
        assert_eq!(
            seen[1].kind,
            ChangeKind::Items {
                index: 0,
                removed: vec![HostValue::from("a")],
                added: vec![HostValue::from("b")],
            }
        );
    }

    #[test]
    fn test_unbound_list_is_silent() {
        let list = ObservableList::new(vec![HostValue::from(1)]);
        list.push(HostValue::from(2));
        assert_eq!(list.len(), 2);
        assert_eq!(list.snapshot(), vec![HostValue::from(1), HostValue::from(2)]);
    }

    #[test]
    fn test_unbind_detaches_from_owner() {
        let notifier = ChangeNotifier::new_shared();
        let (_, seen) = recorder(&notifier);
        let list = ObservableList::bound(Vec::new(), &notifier, "items");

        list.push(HostValue::from("a"));
        list.unbind();
        list.push(HostValue::from("b"));

        assert_eq!(seen.lock().len(), 1);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_list_index_errors() {
        let list = ObservableList::new(Vec::new());
        assert!(matches!(
            list.get_item(0),
            Err(HostError::IndexOutOfRange { index: 0, len: 0 })
        ));
        assert!(list.set_item(3, HostValue::Null).is_err());
        assert!(list.remove(0).is_err());
    }

    #[test]
    fn test_listener_may_read_list_back() {
        let notifier = ChangeNotifier::new_shared();
        let list = ObservableList::bound(Vec::new(), &notifier, "items");
        let observed = Arc::new(Mutex::new(0));

        let reader = list.clone();
        let out = observed.clone();
        notifier.subscribe(Arc::new(move |_: &AttributeChange| {
            *out.lock() = reader.len();
        }));

        list.push(HostValue::from(1));
        list.push(HostValue::from(2));
        assert_eq!(*observed.lock(), 2);
    }
}
