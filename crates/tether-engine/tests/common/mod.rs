//! Shared fixtures for the integration suites.
//!
//! `Bar` is a stateful class with callbacks and a fallible method; `TestRack`
//! carries overloaded statics. Registration runs once per test binary.

#![allow(dead_code)]

use std::sync::Once;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_engine::{expose, Callback, ParamMeta, RetMeta};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bottle {
    pub name: String,
    pub category: String,
    pub country: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BarError {
    #[error("Sorry, this bottle is not in our selection")]
    BottleNotFound,
}

#[derive(Default)]
pub struct Bar {
    selection: Vec<Bottle>,
    add_listeners: Vec<Callback<(Bottle,)>>,
    remove_listeners: Vec<Callback<(Bottle,)>>,
}

impl Bar {
    pub fn philosophy() -> String {
        "I have mixed drinks about feelings.".to_string()
    }

    pub fn with_selection(selection: Vec<Bottle>) -> Self {
        Bar {
            selection,
            ..Bar::default()
        }
    }

    pub fn add_bottle(&mut self, name: String, category: String, country: String) {
        let bottle = Bottle {
            name,
            category,
            country,
        };
        self.selection.push(bottle.clone());
        for listener in &self.add_listeners {
            listener.fire((bottle.clone(),));
        }
    }

    pub fn restock(&mut self, bottle: Bottle) {
        self.selection.push(bottle.clone());
        for listener in &self.add_listeners {
            listener.fire((bottle.clone(),));
        }
    }

    pub fn remove_bottle(&mut self, name: String) -> Result<Bottle, BarError> {
        let index = self
            .selection
            .iter()
            .position(|bottle| bottle.name == name)
            .ok_or(BarError::BottleNotFound)?;
        let bottle = self.selection.remove(index);
        for listener in &self.remove_listeners {
            listener.fire((bottle.clone(),));
        }
        Ok(bottle)
    }

    pub fn on_add(&mut self, listener: Callback<(Bottle,)>) {
        self.add_listeners.push(listener);
    }

    pub fn on_remove(&mut self, listener: Callback<(Bottle,)>) {
        self.remove_listeners.push(listener);
    }

    pub fn get_selection(&self) -> Vec<Bottle> {
        self.selection.clone()
    }

    /// Returns immediately; the drink arrives later through the callback,
    /// fired from a background thread.
    pub fn prepare_drink(&self, done: Callback<(String,)>) -> String {
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            done.fire(("Please enjoy your drink!".to_string(),));
        });
        "Drink in preparation, you will be called back".to_string()
    }
}

pub struct TestRack;

impl TestRack {
    pub fn crazy() -> String {
        "who is crazy?".to_string()
    }

    pub fn crazy_about(who: String) -> String {
        format!("{who} is crazy!")
    }
}

/// Bind the fixture classes into the process-wide registry, once per test
/// binary.
pub fn register_fixtures() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        expose::<Bar>("Bar")
            .constructor(Bar::default)
            .constructor_described(
                Bar::with_selection,
                "Creates a bar stocked with an initial selection",
                vec![ParamMeta::required("selection", "bottles to start with")],
            )
            .member_described(
                "addBottle",
                Bar::add_bottle,
                "Adds a bottle to the selection",
                RetMeta::new("null", "nothing"),
                vec![
                    ParamMeta::required("name", "name of the bottle"),
                    ParamMeta::optional("category", "n/a", "category of the drink"),
                    ParamMeta::optional("country", "n/a", "country of production"),
                ],
            )
            .member("restock", Bar::restock)
            .member("removeBottle", Bar::remove_bottle)
            .member_const("getSelection", Bar::get_selection)
            .member("onAdd", Bar::on_add)
            .member("onRemove", Bar::on_remove)
            .member_const("prepareDrink", Bar::prepare_drink)
            .static_fn("philosophy", Bar::philosophy);

        expose::<TestRack>("TestRack")
            .static_fn("crazy", TestRack::crazy)
            .static_fn("crazy", TestRack::crazy_about);
    });
}
