//! Plugin hooks
//!
//! Plugins observe and may rewrite the message at fixed points of the
//! load and invocation pipelines. Hooks are broadcast to every registered
//! plugin in registration order; all hooks default to no-ops.

use crate::document::{Document, Element};
use crate::sudsobject::Value;

/// Context for document-load hooks.
#[derive(Debug)]
pub struct DocumentContext {
    pub url: String,
    /// Raw bytes as fetched; `loaded` may rewrite them before parsing
    pub bytes: Vec<u8>,
    /// The parsed tree, present for the `parsed` hook
    pub document: Option<Document>,
}

/// Context for message hooks during an invocation.
#[derive(Debug, Default)]
pub struct MessageContext {
    /// The marshalled request envelope (`marshalled`)
    pub envelope: Option<Element>,
    /// The serialized message bytes (`sending` / `received`)
    pub message: Option<Vec<u8>>,
    /// The parsed reply document (`parsed_reply`)
    pub reply: Option<Document>,
    /// The unmarshalled return value (`unmarshalled`)
    pub value: Option<Value>,
}

/// One plugin. Every hook may rewrite its context in place.
pub trait Plugin {
    /// A document has been fetched, before parsing
    fn loaded(&mut self, _ctx: &mut DocumentContext) {}

    /// A document has been parsed
    fn parsed(&mut self, _ctx: &mut DocumentContext) {}

    /// The request envelope has been marshalled
    fn marshalled(&mut self, _ctx: &mut MessageContext) {}

    /// The request bytes are about to be sent
    fn sending(&mut self, _ctx: &mut MessageContext) {}

    /// Reply bytes have been received, before parsing
    fn received(&mut self, _ctx: &mut MessageContext) {}

    /// The reply document has been parsed, before unmarshalling
    fn parsed_reply(&mut self, _ctx: &mut MessageContext) {}

    /// The return value has been unmarshalled
    fn unmarshalled(&mut self, _ctx: &mut MessageContext) {}
}

/// Broadcasts each hook to every registered plugin in order.
#[derive(Default)]
pub struct PluginContainer {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn loaded(&mut self, ctx: &mut DocumentContext) {
        for plugin in &mut self.plugins {
            plugin.loaded(ctx);
        }
    }

    pub fn parsed(&mut self, ctx: &mut DocumentContext) {
        for plugin in &mut self.plugins {
            plugin.parsed(ctx);
        }
    }

    pub fn marshalled(&mut self, ctx: &mut MessageContext) {
        for plugin in &mut self.plugins {
            plugin.marshalled(ctx);
        }
    }

    pub fn sending(&mut self, ctx: &mut MessageContext) {
        for plugin in &mut self.plugins {
            plugin.sending(ctx);
        }
    }

    pub fn received(&mut self, ctx: &mut MessageContext) {
        for plugin in &mut self.plugins {
            plugin.received(ctx);
        }
    }

    pub fn parsed_reply(&mut self, ctx: &mut MessageContext) {
        for plugin in &mut self.plugins {
            plugin.parsed_reply(ctx);
        }
    }

    pub fn unmarshalled(&mut self, ctx: &mut MessageContext) {
        for plugin in &mut self.plugins {
            plugin.unmarshalled(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rewriter;
    impl Plugin for Rewriter {
        fn received(&mut self, ctx: &mut MessageContext) {
            if let Some(message) = &mut ctx.message {
                *message = b"<rewritten/>".to_vec();
            }
        }
    }

    #[test]
    fn test_hook_rewrites_in_place() {
        let mut container = PluginContainer::new();
        container.add(Box::new(Rewriter));
        let mut ctx = MessageContext {
            message: Some(b"<original/>".to_vec()),
            ..Default::default()
        };
        container.received(&mut ctx);
        assert_eq!(ctx.message.as_deref(), Some(&b"<rewritten/>"[..]));
    }

    #[test]
    fn test_parsed_hook_edits_the_document() {
        struct Stamp;
        impl Plugin for Stamp {
            fn parsed(&mut self, ctx: &mut DocumentContext) {
                if let Some(document) = &mut ctx.document {
                    if let Some(root) = document.root_mut() {
                        root.set("checked", "true");
                    }
                }
            }
        }
        let mut container = PluginContainer::new();
        container.add(Box::new(Stamp));
        let mut ctx = DocumentContext {
            url: "mem://d".to_string(),
            bytes: Vec::new(),
            document: Some(Document::from_string("<definitions/>").unwrap()),
        };
        container.parsed(&mut ctx);
        let document = ctx.document.unwrap();
        assert_eq!(document.root().unwrap().get("checked"), Some("true"));
    }

    #[test]
    fn test_order_is_registration_order() {
        struct Tag(u8);
        impl Plugin for Tag {
            fn sending(&mut self, ctx: &mut MessageContext) {
                if let Some(message) = &mut ctx.message {
                    message.push(self.0);
                }
            }
        }
        let mut container = PluginContainer::new();
        container.add(Box::new(Tag(1)));
        container.add(Box::new(Tag(2)));
        let mut ctx = MessageContext {
            message: Some(Vec::new()),
            ..Default::default()
        };
        container.sending(&mut ctx);
        assert_eq!(ctx.message.as_deref(), Some(&[1u8, 2u8][..]));
    }
}
