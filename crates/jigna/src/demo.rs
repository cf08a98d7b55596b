//! Demo models served by the `jigna` binary

use std::sync::Arc;

use parking_lot::RwLock;

use jigna_runtime::{ChangeNotifier, HostError, HostValue, Model, Observable, ObservableList};

/// Body of the demo document
pub const BODY_HTML: &str = r#"<div ng-controller="jigna">
  Name: <input ng-model="person.name"/>
  Age: <input ng-model="person.age" type="number"/>
  <button ng-click="person.birthday()">Birthday</button>
  <p>{{person.greet(person.name)}}</p>
  <ul><li ng-repeat="friend in person.friends">{{friend.name}} ({{friend.age}})</li></ul>
</div>"#;

/// A person with a name, an age and friends
pub struct Person {
    name: RwLock<String>,
    age: RwLock<i64>,
    friends: Arc<ObservableList>,
    notifier: Arc<ChangeNotifier>,
}

impl Person {
    pub fn shared(name: &str, age: i64) -> Arc<Self> {
        let notifier = ChangeNotifier::new_shared();
        Arc::new(Self {
            name: RwLock::new(name.to_string()),
            age: RwLock::new(age),
            friends: ObservableList::bound(Vec::new(), &notifier, "friends"),
            notifier,
        })
    }

    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        let old = std::mem::replace(&mut *self.name.write(), name.clone());
        self.notifier.notify_replaced("name", old.into(), name.into());
    }

    pub fn age(&self) -> i64 {
        *self.age.read()
    }

    pub fn set_age(&self, age: i64) {
        let old = std::mem::replace(&mut *self.age.write(), age);
        self.notifier.notify_replaced("age", old.into(), age.into());
    }

    pub fn friends(&self) -> &Arc<ObservableList> {
        &self.friends
    }

    pub fn add_friend(&self, friend: Arc<Person>) {
        self.friends.push(HostValue::instance(friend));
    }

    /// Number of sessions observing this person
    pub fn observer_count(&self) -> usize {
        self.notifier.listener_count()
    }
}

impl Model for Person {
    fn type_name(&self) -> &str {
        "demo.Person"
    }

    fn attribute_names(&self) -> Vec<String> {
        vec!["name".into(), "age".into(), "friends".into()]
    }

    fn method_names(&self) -> Vec<String> {
        vec!["greet".into(), "birthday".into(), "add_friend".into()]
    }

    fn get_attribute(&self, name: &str) -> Result<HostValue, HostError> {
        match name {
            "name" => Ok(self.name().into()),
            "age" => Ok(self.age().into()),
            "friends" => Ok(HostValue::list(self.friends.clone())),
            _ => Err(HostError::no_such_attribute(self.type_name(), name)),
        }
    }

    fn set_attribute(&self, name: &str, value: HostValue) -> Result<(), HostError> {
        match name {
            "name" => self.set_name(String::try_from(value)?),
            "age" => self.set_age(i64::try_from(value)?),
            _ => return Err(HostError::read_only(self.type_name(), name)),
        }
        Ok(())
    }

    fn call_method(&self, name: &str, args: Vec<HostValue>) -> Result<HostValue, HostError> {
        match name {
            "greet" => {
                HostError::check_arity(name, &args, 1)?;
                let whom = String::try_from(args.into_iter().next().unwrap_or_default())?;
                Ok(format!("Hello, {whom}").into())
            }
            "birthday" => {
                HostError::check_arity(name, &args, 0)?;
                let age = self
                    .age()
                    .checked_add(1)
                    .ok_or_else(|| HostError::Failed("age overflow".into()))?;
                self.set_age(age);
                Ok(age.into())
            }
            "add_friend" => {
                HostError::check_arity(name, &args, 2)?;
                let mut args = args.into_iter();
                let friend_name = String::try_from(args.next().unwrap_or_default())?;
                let friend_age = i64::try_from(args.next().unwrap_or_default())?;
                let friend = Person::shared(&friend_name, friend_age);
                self.add_friend(friend.clone());
                Ok(HostValue::instance(friend))
            }
            _ => Err(HostError::no_such_method(self.type_name(), name)),
        }
    }

    fn observable(&self) -> Option<&dyn Observable> {
        Some(&*self.notifier)
    }
}

/// Context served to every session of the demo
pub fn context() -> Vec<(String, HostValue)> {
    let person = Person::shared("Fred", 42);
    person.add_friend(Person::shared("Wilma", 40));
    person.add_friend(Person::shared("Barney", 41));
    vec![("person".to_string(), HostValue::instance(person))]
}
