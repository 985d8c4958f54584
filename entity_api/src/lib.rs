use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Value};
use std::collections::HashMap;

pub use entity::{ideas, roles::Role, similarity_alerts, users, Id};

pub mod error;
pub mod idea;
pub mod query;
pub mod similarity_alert;
pub mod user;

/// `QueryFilterMap` is a data structure that serves as a bridge for translating filter parameters
/// between different layers of the application. It is essentially a wrapper around a `HashMap`
/// where the keys are filter parameter names (as `String`) and the values are optional `Value` types
/// from `sea_orm`.
///
/// # Example
///
/// ```
/// use sea_orm::Value;
/// use entity_api::{Id, QueryFilterMap};
///
/// let mut query_filter_map = QueryFilterMap::new();
/// query_filter_map.insert("author_id".to_string(), Some(Value::Uuid(Some(Box::new(Id::new_v4())))));
/// let filter_value = query_filter_map.get("author_id");
/// assert!(filter_value.is_some());
/// ```
pub struct QueryFilterMap {
    map: HashMap<String, Option<Value>>,
}

impl QueryFilterMap {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        // HashMap.get returns an Option and so we need to "flatten" this to a single Option
        self.map
            .get(key)
            .and_then(|inner_option| inner_option.clone())
    }

    pub fn insert(&mut self, key: String, value: Option<Value>) {
        self.map.insert(key, value);
    }
}

impl Default for QueryFilterMap {
    fn default() -> Self {
        Self::new()
    }
}

/// `IntoQueryFilterMap` is a trait that provides a method for converting a struct into a `QueryFilterMap`.
/// Implementing this trait for a struct allows you to define how the fields of the struct should be
/// mapped to the keys and values of the `QueryFilterMap`.
pub trait IntoQueryFilterMap {
    fn into_query_filter_map(self) -> QueryFilterMap;
}

/// Inserts the accounts a fresh development database needs: one moderator and
/// two ordinary authors. Ideas are left out so that every seeded idea goes
/// through the publish pipeline and carries a real embedding.
pub async fn seed_database(db: &impl ConnectionTrait) -> Result<(), error::Error> {
    let now = Utc::now();

    let seed_users = [
        ("admin@ideaplatform.dev", "admin", "Admin", "User", Role::Admin),
        ("ada@ideaplatform.dev", "ada", "Ada", "Lovelace", Role::User),
        ("grace@ideaplatform.dev", "grace", "Grace", "Hopper", Role::User),
    ];

    for (email, username, first_name, last_name, role) in seed_users {
        let user = users::ActiveModel {
            id: Set(Id::new_v4()),
            email: Set(email.to_owned()),
            username: Set(username.to_owned()),
            first_name: Set(Some(first_name.to_owned())),
            last_name: Set(Some(last_name.to_owned())),
            role: Set(role),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(db)
        .await?;

        log::info!("Seeded user {} ({})", user.username, user.role);
    }

    Ok(())
}
