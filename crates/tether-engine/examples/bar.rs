//! End-to-end tour: bind a class, dispatch envelopes, receive callback
//! events.
//!
//! Run with `cargo run --example bar`.

use serde::{Deserialize, Serialize};
use tether_engine::{expose, host, Callback};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Bottle {
    name: String,
    category: String,
    country: String,
}

#[derive(Default)]
struct Bar {
    selection: Vec<Bottle>,
    listeners: Vec<Callback<(Bottle,)>>,
}

impl Bar {
    fn philosophy() -> String {
        "I have mixed drinks about feelings.".to_string()
    }

    fn add_bottle(&mut self, name: String, category: String, country: String) {
        let bottle = Bottle {
            name,
            category,
            country,
        };
        self.selection.push(bottle.clone());
        for listener in &self.listeners {
            listener.fire((bottle.clone(),));
        }
    }

    fn on_add(&mut self, listener: Callback<(Bottle,)>) {
        self.listeners.push(listener);
    }

    fn get_selection(&self) -> Vec<Bottle> {
        self.selection.clone()
    }
}

fn main() {
    expose::<Bar>("Bar")
        .constructor(Bar::default)
        .member("addBottle", Bar::add_bottle)
        .member("onAdd", Bar::on_add)
        .member("getSelection", Bar::get_selection)
        .static_fn("philosophy", Bar::philosophy);

    host::on_callback(|event| {
        println!("callback event: {}", event.to_json());
    });

    for request in [
        r#"{"c":"Bar","f":"philosophy","a":[]}"#,
        r#"{"c":"Bar","f":"__createShared__","a":["bar1"]}"#,
        r#"{"c":"bar1","f":"onAdd","a":["cb-7"]}"#,
        r#"{"c":"bar1","f":"addBottle","a":["gin","spirit","UK"]}"#,
        r#"{"c":"bar1","f":"getSelection","a":[]}"#,
        r#"{"c":"Bar","f":"__delete__","a":["bar1"]}"#,
    ] {
        match host::call(request) {
            Ok(response) => println!("{request}\n  -> {response}"),
            Err(e) => println!("{request}\n  !! {e}"),
        }
    }
}
