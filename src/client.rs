//! SOAP service client
//!
//! Ties the pipeline together: load the WSDL, marshal an invocation into
//! an envelope, exchange it over the transport, and unmarshal the reply
//! body into a value. A `<Fault>` reply surfaces as [`Error::WebFault`]
//! carrying both the parsed fault object and the raw document.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::bindings::{self, SoapBinding};
use crate::document::{Document, Element};
use crate::error::{Error, Result};
use crate::options::Options;
use crate::plugin::MessageContext;
use crate::reader::DefinitionsReader;
use crate::sudsobject::{SudsObject, Value};
use crate::transport::{Reply, Request};
use crate::namespaces::QName;
use crate::umx::{Basic, Unmarshaller};
use crate::xsd::resolver::NodeResolver;
use crate::wsdl::{Definitions, Method};
use crate::xsd::schema::Schema;
use crate::SOAP_ENV_NAMESPACE;

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// A client bound to one WSDL.
pub struct Client {
    definitions: Arc<Definitions>,
    options: Options,
}

impl Client {
    /// Load the WSDL at `url` and bind to it.
    pub fn new(url: &str, mut options: Options) -> Result<Self> {
        let definitions = DefinitionsReader::new(&mut options).open(url)?;
        Ok(Self {
            definitions,
            options,
        })
    }

    /// The loaded WSDL model
    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    /// Invoke a method with positional and named arguments.
    pub fn invoke(
        &mut self,
        name: &str,
        args: Vec<Value>,
        kwargs: IndexMap<String, Value>,
    ) -> Result<Value> {
        let definitions = Arc::clone(&self.definitions);
        let service = definitions.service(self.options.service.as_deref())?;
        let port = service.port(self.options.port.as_deref())?;
        let method = port.method(name)?;
        let binding = bindings::select(method)?;
        let schema = &definitions.schema;

        let body = binding.bodycontent(schema, method, args, kwargs)?;
        let header = self.headercontent()?;
        let envelope = binding.envelope(header, body);
        let mut ctx = MessageContext {
            envelope: Some(envelope),
            ..Default::default()
        };
        self.options.plugins.marshalled(&mut ctx);
        let envelope = ctx
            .envelope
            .take()
            .ok_or_else(|| Error::Type("plugin discarded the request envelope".to_string()))?;
        ctx.message = Some(format!("{}{}", XML_DECL, envelope.to_xml()).into_bytes());
        self.options.plugins.sending(&mut ctx);
        let message = ctx.message.take().unwrap_or_default();

        let location = if port.location.is_empty() {
            definitions.url.clone()
        } else {
            port.location.clone()
        };
        let request = Request::new(location)
            .with_header("Content-Type", "text/xml; charset=utf-8")
            .with_header("SOAPAction", format!("\"{}\"", method.action))
            .with_message(message);
        debug!(method = name, url = request.url.as_str(), "invoking");
        let reply = self.options.transport.send(&request)?;
        self.succeeded(binding.as_ref(), method, schema, reply)
    }

    /// Build a skeleton instance of a schema type with every field
    /// present and defaulted, ready to fill in and pass to [`invoke`].
    /// A plain local name resolves against the WSDL target namespace.
    ///
    /// [`invoke`]: Client::invoke
    pub fn create(&self, name: &str) -> Result<Value> {
        let schema = &self.definitions.schema;
        let qname = QName::new(self.definitions.target_namespace.as_deref(), name);
        let id = schema
            .xsd_type(&qname)
            .or_else(|| schema.element(&qname))
            .or_else(|| schema.xsd_type(&QName::local(name)))
            .ok_or_else(|| Error::Build {
                name: name.to_string(),
                reason: "not defined in the service schema".to_string(),
            })?;
        let resolver = NodeResolver::new(schema);
        let real = resolver.real_type(id);
        let mut object = SudsObject::new(name);
        object.metadata.sxtype = Some(real);
        object.metadata.type_qname = schema.node(real).qname();
        for child in schema.type_elements(real) {
            let decl = schema.node(child);
            let field = match &decl.name {
                Some(field) => field.as_str(),
                None => continue,
            };
            if decl.multi_occurrence() {
                object.set(field, Value::List(Vec::new()));
            } else {
                object.set(field, Value::Null);
            }
        }
        Ok(Value::Object(object))
    }

    /// Marshal the configured SOAP headers, untyped.
    fn headercontent(&self) -> Result<Vec<Element>> {
        let mut header = Vec::with_capacity(self.options.soap_headers.len());
        for (name, value) in &self.options.soap_headers {
            let mut marshaller = crate::mx::basic::Basic::new();
            header.push(marshaller.process_value(value.clone(), Some(name))?);
        }
        Ok(header)
    }

    /// Process a transport reply into the method's return value.
    fn succeeded(
        &mut self,
        binding: &dyn SoapBinding,
        method: &Method,
        schema: &Schema,
        reply: Reply,
    ) -> Result<Value> {
        match reply.code {
            200 | 500 => {}
            202 | 204 => return Ok(Value::Null),
            code => return Err(Error::Transport(format!("HTTP status {code}"))),
        }
        if reply.message.is_empty() {
            return match reply.code {
                200 => Ok(Value::Null),
                code => Err(Error::Transport(format!("HTTP status {code}"))),
            };
        }
        let mut ctx = MessageContext {
            message: Some(reply.message),
            ..Default::default()
        };
        self.options.plugins.received(&mut ctx);
        let bytes = ctx.message.take().unwrap_or_default();
        ctx.reply = Some(Document::parse(&bytes)?);
        self.options.plugins.parsed_reply(&mut ctx);
        let document = ctx
            .reply
            .take()
            .ok_or_else(|| Error::Parse("plugin discarded the reply document".to_string()))?;

        let body = soap_body(&document)?;
        if let Some(fault) = body.children.iter().find(|c| c.name == "Fault") {
            return Err(webfault(fault, document.clone()));
        }
        if reply.code == 500 {
            return Err(Error::Transport(
                "HTTP status 500 without a SOAP fault".to_string(),
            ));
        }
        let nodes = binding.replycontent(body);
        let value = binding.unmarshal(schema, method, nodes)?;
        let mut ctx = MessageContext {
            value: Some(value),
            ..Default::default()
        };
        self.options.plugins.unmarshalled(&mut ctx);
        Ok(ctx.value.take().unwrap_or(Value::Null))
    }
}

/// The SOAP Body child of a reply envelope.
fn soap_body(document: &Document) -> Result<&Element> {
    let root = document
        .root()
        .ok_or_else(|| Error::Parse("empty reply document".to_string()))?;
    if root.name != "Envelope" {
        return Err(Error::Parse(format!(
            "expected a SOAP Envelope, got <{}>",
            root.name
        )));
    }
    root.children
        .iter()
        .find(|c| c.name == "Body" && c.namespace.as_deref() == Some(SOAP_ENV_NAMESPACE))
        .ok_or_else(|| Error::Parse("reply envelope has no Body".to_string()))
}

/// Build a WebFault from a `<Fault>` body child.
fn webfault(fault: &Element, document: Document) -> Error {
    let text_of = |name: &str| {
        fault
            .child(name)
            .and_then(|c| c.text())
            .unwrap_or("")
            .to_string()
    };
    let parsed = match Basic.process(fault) {
        Ok(Value::Object(object)) => object,
        _ => SudsObject::new("Fault"),
    };
    Error::WebFault {
        code: text_of("faultcode"),
        string: text_of("faultstring"),
        fault: Box::new(parsed),
        document: Box::new(document),
    }
}
