//! Business entities and the logic around them. Request and response
//! contracts in [`crate::models`] build on these types; nothing here depends
//! on the contracts.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

pub const FIRST_USER_ID: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: u64,
    pub name: String,
    pub email: String,
    pub age: u8,
    pub is_active: bool,
}

/// Hands out user ids. Users are not persisted; lookups only know the demo
/// user.
#[derive(Debug)]
pub struct Users {
    next_id: AtomicU64,
}

impl Default for Users {
    fn default() -> Self {
        Users {
            next_id: AtomicU64::new(FIRST_USER_ID),
        }
    }
}

impl Users {
    pub fn create(&self, name: &str, email: &str, age: u8, is_active: bool) -> User {
        let user_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        User {
            user_id,
            name: name.to_string(),
            email: email.to_string(),
            age,
            is_active,
        }
    }

    pub fn find(&self, user_id: u64) -> Option<User> {
        (user_id == FIRST_USER_ID).then(demo_user)
    }
}

fn demo_user() -> User {
    User {
        user_id: FIRST_USER_ID,
        name: "John Doe".to_string(),
        email: "john@example.com".to_string(),
        age: 30,
        is_active: true,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Greeting {
    pub greeting: String,
    pub source: String,
    pub status: String,
}

pub fn greeting(name: &str) -> Greeting {
    Greeting {
        greeting: format!("Hello, {name}!"),
        source: "helper module".to_string(),
        status: "success".to_string(),
    }
}

pub fn multiply(a: i64, b: i64) -> i64 {
    a * b
}
