//! Models shared by the unit tests

use std::sync::{Arc, Weak};

use jigna_types::Event;
use parking_lot::{Mutex, RwLock};

use crate::broker::EventSink;
use crate::host::{HostError, HostValue, ListModel, Model};
use crate::observe::{ChangeNotifier, Observable, ObservableList};

/// Unobserved model with a counter and a method returning itself
pub struct Counter {
    count: RwLock<i64>,
    this: Weak<Counter>,
}

impl Counter {
    pub fn shared(count: i64) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            count: RwLock::new(count),
            this: this.clone(),
        })
    }
}

impl Model for Counter {
    fn type_name(&self) -> &str {
        "testutil.Counter"
    }

    fn attribute_names(&self) -> Vec<String> {
        vec!["count".into()]
    }

    fn method_names(&self) -> Vec<String> {
        vec!["increment".into(), "this".into()]
    }

    fn get_attribute(&self, name: &str) -> Result<HostValue, HostError> {
        match name {
            "count" => Ok((*self.count.read()).into()),
            _ => Err(HostError::no_such_attribute(self.type_name(), name)),
        }
    }

    fn call_method(&self, name: &str, args: Vec<HostValue>) -> Result<HostValue, HostError> {
        HostError::check_arity(name, &args, 0)?;
        match name {
            "increment" => {
                let mut count = self.count.write();
                *count += 1;
                Ok((*count).into())
            }
            "this" => Ok(self.this.upgrade().map(HostValue::instance).into()),
            _ => Err(HostError::no_such_method(self.type_name(), name)),
        }
    }
}

/// Observed model with scalar and list attributes
pub struct Person {
    name: RwLock<String>,
    age: RwLock<i64>,
    friends: RwLock<Arc<ObservableList>>,
    notifier: Arc<ChangeNotifier>,
}

impl Person {
    pub fn shared(name: &str, age: i64) -> Arc<Self> {
        let notifier = ChangeNotifier::new_shared();
        Arc::new(Self {
            name: RwLock::new(name.to_string()),
            age: RwLock::new(age),
            friends: RwLock::new(ObservableList::bound(Vec::new(), &notifier, "friends")),
            notifier,
        })
    }

    pub fn age(&self) -> i64 {
        *self.age.read()
    }

    pub fn set_age(&self, age: i64) {
        let old = std::mem::replace(&mut *self.age.write(), age);
        self.notifier.notify_replaced("age", old.into(), age.into());
    }

    pub fn friends(&self) -> Arc<ObservableList> {
        self.friends.read().clone()
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }
}

impl Model for Person {
    fn type_name(&self) -> &str {
        "testutil.Person"
    }

    fn attribute_names(&self) -> Vec<String> {
        ["name", "age", "friends", "_secret", "notifier"]
            .map(String::from)
            .to_vec()
    }

    fn method_names(&self) -> Vec<String> {
        ["greet", "birthday", "call_method", "_reset"]
            .map(String::from)
            .to_vec()
    }

    fn ignored_members(&self) -> &[&str] {
        &["notifier"]
    }

    fn get_attribute(&self, name: &str) -> Result<HostValue, HostError> {
        match name {
            "name" => Ok(self.name.read().clone().into()),
            "age" => Ok(self.age().into()),
            "friends" => Ok(HostValue::list(self.friends())),
            "_secret" => Ok("hidden".into()),
            _ => Err(HostError::no_such_attribute(self.type_name(), name)),
        }
    }

    fn set_attribute(&self, name: &str, value: HostValue) -> Result<(), HostError> {
        match name {
            "name" => {
                let name = String::try_from(value)?;
                let old = std::mem::replace(&mut *self.name.write(), name.clone());
                self.notifier.notify_replaced("name", old.into(), name.into());
            }
            "age" => self.set_age(i64::try_from(value)?),
            "friends" => {
                let items = match value {
                    HostValue::Data(serde_json::Value::Array(items)) => {
                        items.into_iter().map(HostValue::from).collect()
                    }
                    HostValue::List(list) => (0..list.len())
                        .map(|i| list.get_item(i))
                        .collect::<Result<Vec<_>, _>>()?,
                    other => {
                        return Err(HostError::TypeMismatch {
                            expected: "list",
                            actual: other.type_name(),
                        });
                    }
                };
                let new = ObservableList::bound(items, &self.notifier, "friends");
                let old = std::mem::replace(&mut *self.friends.write(), new.clone());
                old.unbind();
                self.notifier
                    .notify_replaced("friends", HostValue::list(old), HostValue::list(new));
            }
            _ => return Err(HostError::read_only(self.type_name(), name)),
        }
        Ok(())
    }

    fn call_method(&self, name: &str, args: Vec<HostValue>) -> Result<HostValue, HostError> {
        match name {
            "greet" => {
                HostError::check_arity(name, &args, 1)?;
                let whom = args[0].as_str().unwrap_or_default();
                Ok(format!("Hello, {whom}").into())
            }
            "birthday" => {
                HostError::check_arity(name, &args, 0)?;
                self.set_age(self.age() + 1);
                Ok(self.age().into())
            }
            _ => Err(HostError::no_such_method(self.type_name(), name)),
        }
    }

    fn observable(&self) -> Option<&dyn Observable> {
        Some(&*self.notifier)
    }
}

/// Event sink that records everything pushed to it
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

impl EventSink for RecordingSink {
    fn send_event(&self, event: Event) {
        self.events.lock().push(event);
    }
}
