//! WSDL definitions model
//!
//! Parses a `<definitions>` document into services, ports, and methods,
//! loading the embedded `<types>` schemas through the schema model.
//! Schema fragments are added in dependency order so cross-namespace
//! references resolve regardless of document order.

use indexmap::IndexMap;
use tracing::debug;

use crate::document::{Document, Element};
use crate::error::{Error, Result};
use crate::namespaces::QName;
use crate::xsd::depsort::dependency_sort;
use crate::xsd::qualify;
use crate::xsd::schema::{Schema, SchemaLoader};
use crate::{WSDL_NAMESPACE, WSDL_SOAP_NAMESPACE};

/// soap:binding / soap:operation style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoapStyle {
    Document,
    Rpc,
}

/// soap:body use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoapUse {
    Literal,
    Encoded,
}

/// One message part: a named parameter backed by an element or type.
#[derive(Debug, Clone)]
pub struct Part {
    pub name: String,
    /// The referenced element or type, qualified
    pub type_ref: QName,
    /// Whether `type_ref` names an element declaration rather than a type
    pub is_element: bool,
}

/// A fully resolved operation on a port.
#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    /// soapAction header value
    pub action: String,
    pub style: SoapStyle,
    pub use_: SoapUse,
    pub input_parts: Vec<Part>,
    pub output_parts: Vec<Part>,
    /// soap:body namespace for the rpc wrapper element
    pub namespace: Option<String>,
}

/// A service port bound to an address.
#[derive(Debug, Clone)]
pub struct Port {
    pub name: String,
    pub binding_style: SoapStyle,
    pub location: String,
    pub methods: IndexMap<String, Method>,
}

impl Port {
    pub fn method(&self, name: &str) -> Result<&Method> {
        self.methods
            .get(name)
            .ok_or_else(|| Error::MethodNotFound(name.to_string()))
    }
}

/// A named service: a collection of ports.
#[derive(Debug, Clone)]
pub struct Service {
    pub name: String,
    pub ports: Vec<Port>,
}

impl Service {
    /// A port by name, or the first one when no name is given.
    pub fn port(&self, name: Option<&str>) -> Result<&Port> {
        match name {
            Some(name) => self
                .ports
                .iter()
                .find(|p| p.name == name)
                .ok_or_else(|| Error::PortNotFound(name.to_string())),
            None => self
                .ports
                .first()
                .ok_or_else(|| Error::PortNotFound("(default)".to_string())),
        }
    }
}

/// A parsed WSDL document.
#[derive(Debug)]
pub struct Definitions {
    pub url: String,
    pub target_namespace: Option<String>,
    pub schema: Schema,
    pub services: Vec<Service>,
}

/// An unresolved operation from a `<portType>`.
#[derive(Debug)]
struct PortTypeOp {
    input: Option<String>,
    output: Option<String>,
}

/// Binding detail for one operation.
#[derive(Debug)]
struct BindingOp {
    action: String,
    style: Option<SoapStyle>,
    use_: SoapUse,
    namespace: Option<String>,
}

/// An unresolved `<binding>`.
#[derive(Debug)]
struct Binding {
    port_type: String,
    style: SoapStyle,
    operations: IndexMap<String, BindingOp>,
}

impl Definitions {
    /// Parse a WSDL document fetched from `url`. Imported schema
    /// documents are fetched through the loader.
    pub fn parse(
        document: &Document,
        url: impl Into<String>,
        loader: &mut dyn SchemaLoader,
    ) -> Result<Self> {
        let root = document
            .root()
            .ok_or_else(|| Error::Parse("empty WSDL document".to_string()))?;
        if root.name != "definitions" {
            return Err(Error::Parse(format!(
                "expected <definitions>, got <{}>",
                root.name
            )));
        }
        let target_namespace = root.get("targetNamespace").map(|s| s.to_string());
        let tns = target_namespace.as_deref();

        let schema = Self::parse_types(root, loader)?;
        let messages = Self::parse_messages(root, tns)?;
        let port_types = Self::parse_port_types(root)?;
        let bindings = Self::parse_bindings(root)?;
        let services = Self::parse_services(root, &messages, &port_types, &bindings)?;

        Ok(Self {
            url: url.into(),
            target_namespace,
            schema,
            services,
        })
    }

    /// A service by name, or the first one when no name is given.
    pub fn service(&self, name: Option<&str>) -> Result<&Service> {
        match name {
            Some(name) => self
                .services
                .iter()
                .find(|s| s.name == name)
                .ok_or_else(|| Error::ServiceNotFound(name.to_string())),
            None => self
                .services
                .first()
                .ok_or_else(|| Error::ServiceNotFound("(default)".to_string())),
        }
    }

    /// Collect the `<types>` schema fragments, order them so imported
    /// namespaces load first, and feed them to the schema model.
    fn parse_types(root: &Element, loader: &mut dyn SchemaLoader) -> Result<Schema> {
        let mut fragments: Vec<&Element> = Vec::new();
        for types in children(root, "types", WSDL_NAMESPACE) {
            for fragment in &types.children {
                if fragment.name == "schema" {
                    fragments.push(fragment);
                }
            }
        }
        // Dependency-sort fragments by imported target namespace.
        let tns_of = |f: &Element| f.get("targetNamespace").unwrap_or("").to_string();
        let mut grouped: IndexMap<String, Vec<&Element>> = IndexMap::new();
        let mut graph: IndexMap<String, Vec<String>> = IndexMap::new();
        for fragment in fragments {
            let deps: Vec<String> = fragment
                .children
                .iter()
                .filter(|c| c.name == "import")
                .filter_map(|c| c.get("namespace"))
                .map(|ns| ns.to_string())
                .collect();
            let tns = tns_of(fragment);
            graph.entry(tns.clone()).or_default().extend(deps);
            grouped.entry(tns).or_default().push(fragment);
        }
        let order = dependency_sort(&graph);
        let mut schema = Schema::new();
        for (tns, _) in order {
            for fragment in grouped.get(&tns).into_iter().flatten() {
                schema.add_schema(fragment, loader)?;
            }
        }
        Ok(schema)
    }

    fn parse_messages(
        root: &Element,
        tns: Option<&str>,
    ) -> Result<IndexMap<String, Vec<Part>>> {
        let mut messages = IndexMap::new();
        for message in children(root, "message", WSDL_NAMESPACE) {
            let name = required(message, "name")?;
            let mut parts = Vec::new();
            for part in children(message, "part", WSDL_NAMESPACE) {
                let part_name = required(part, "name")?;
                let (reference, is_element) = match (part.get("element"), part.get("type")) {
                    (Some(element), _) => (element, true),
                    (None, Some(type_ref)) => (type_ref, false),
                    (None, None) => {
                        return Err(Error::Parse(format!(
                            "message part ({part_name}) has neither element nor type"
                        )))
                    }
                };
                parts.push(Part {
                    name: part_name,
                    type_ref: qualify(reference, part, tns)?,
                    is_element,
                });
            }
            messages.insert(name, parts);
        }
        Ok(messages)
    }

    fn parse_port_types(root: &Element) -> Result<IndexMap<String, IndexMap<String, PortTypeOp>>> {
        let mut port_types = IndexMap::new();
        for port_type in children(root, "portType", WSDL_NAMESPACE) {
            let name = required(port_type, "name")?;
            let mut operations = IndexMap::new();
            for op in children(port_type, "operation", WSDL_NAMESPACE) {
                let op_name = required(op, "name")?;
                let message_of = |tag: &str| {
                    op.children
                        .iter()
                        .find(|c| c.name == tag)
                        .and_then(|c| c.get("message"))
                        .map(local_of)
                };
                operations.insert(
                    op_name,
                    PortTypeOp {
                        input: message_of("input"),
                        output: message_of("output"),
                    },
                );
            }
            port_types.insert(name, operations);
        }
        Ok(port_types)
    }

    fn parse_bindings(root: &Element) -> Result<IndexMap<String, Binding>> {
        let mut bindings = IndexMap::new();
        for binding in children(root, "binding", WSDL_NAMESPACE) {
            let name = required(binding, "name")?;
            let port_type = local_of(required(binding, "type")?.as_str());
            let style = children(binding, "binding", WSDL_SOAP_NAMESPACE)
                .next()
                .and_then(|b| b.get("style"))
                .map(style_of)
                .transpose()?
                .unwrap_or(SoapStyle::Document);
            let mut operations = IndexMap::new();
            for op in children(binding, "operation", WSDL_NAMESPACE) {
                let op_name = required(op, "name")?;
                let soap_op = children(op, "operation", WSDL_SOAP_NAMESPACE).next();
                let action = soap_op
                    .and_then(|o| o.get("soapAction"))
                    .unwrap_or("")
                    .to_string();
                let op_style = soap_op
                    .and_then(|o| o.get("style"))
                    .map(style_of)
                    .transpose()?;
                let body = op
                    .children
                    .iter()
                    .find(|c| c.name == "input")
                    .and_then(|input| {
                        children(input, "body", WSDL_SOAP_NAMESPACE).next()
                    });
                let use_ = body
                    .and_then(|b| b.get("use"))
                    .map(use_of)
                    .transpose()?
                    .unwrap_or(SoapUse::Literal);
                let namespace = body
                    .and_then(|b| b.get("namespace"))
                    .map(|s| s.to_string());
                operations.insert(
                    op_name,
                    BindingOp {
                        action,
                        style: op_style,
                        use_,
                        namespace,
                    },
                );
            }
            bindings.insert(
                name,
                Binding {
                    port_type,
                    style,
                    operations,
                },
            );
        }
        Ok(bindings)
    }

    fn parse_services(
        root: &Element,
        messages: &IndexMap<String, Vec<Part>>,
        port_types: &IndexMap<String, IndexMap<String, PortTypeOp>>,
        bindings: &IndexMap<String, Binding>,
    ) -> Result<Vec<Service>> {
        let mut services = Vec::new();
        for service in children(root, "service", WSDL_NAMESPACE) {
            let service_name = required(service, "name")?;
            let mut ports = Vec::new();
            for port in children(service, "port", WSDL_NAMESPACE) {
                let port_name = required(port, "name")?;
                let binding_name = local_of(required(port, "binding")?.as_str());
                let location = children(port, "address", WSDL_SOAP_NAMESPACE)
                    .next()
                    .and_then(|a| a.get("location"))
                    .unwrap_or("")
                    .to_string();
                let binding = match bindings.get(&binding_name) {
                    Some(binding) => binding,
                    None => {
                        debug!(port = port_name, binding = binding_name, "unbound port skipped");
                        continue;
                    }
                };
                let operations = port_types.get(&binding.port_type).ok_or_else(|| {
                    Error::Parse(format!("portType ({}) not defined", binding.port_type))
                })?;
                let mut methods = IndexMap::new();
                for (op_name, bound) in &binding.operations {
                    let op = match operations.get(op_name) {
                        Some(op) => op,
                        None => {
                            debug!(operation = op_name.as_str(), "operation not in portType");
                            continue;
                        }
                    };
                    let parts_of = |message: &Option<String>| {
                        message
                            .as_ref()
                            .and_then(|m| messages.get(m))
                            .cloned()
                            .unwrap_or_default()
                    };
                    methods.insert(
                        op_name.clone(),
                        Method {
                            name: op_name.clone(),
                            action: bound.action.clone(),
                            style: bound.style.unwrap_or(binding.style),
                            use_: bound.use_,
                            input_parts: parts_of(&op.input),
                            output_parts: parts_of(&op.output),
                            namespace: bound.namespace.clone(),
                        },
                    );
                }
                ports.push(Port {
                    name: port_name,
                    binding_style: binding.style,
                    location,
                    methods,
                });
            }
            services.push(Service {
                name: service_name,
                ports,
            });
        }
        Ok(services)
    }
}

/// Child elements matching a local name within a namespace.
fn children<'a>(
    parent: &'a Element,
    name: &'a str,
    uri: &'a str,
) -> impl Iterator<Item = &'a Element> {
    parent
        .children
        .iter()
        .filter(move |c| c.name == name && c.namespace.as_deref() == Some(uri))
}

fn required(node: &Element, attr: &str) -> Result<String> {
    node.get(attr)
        .map(|s| s.to_string())
        .ok_or_else(|| Error::Parse(format!("<{}> missing required attribute ({attr})", node.name)))
}

/// The local part of a possibly prefixed reference.
fn local_of(reference: &str) -> String {
    crate::namespaces::split_prefix(reference).1.to_string()
}

fn style_of(s: &str) -> Result<SoapStyle> {
    match s {
        "document" => Ok(SoapStyle::Document),
        "rpc" => Ok(SoapStyle::Rpc),
        other => Err(Error::Parse(format!("unknown soap style ({other})"))),
    }
}

fn use_of(s: &str) -> Result<SoapUse> {
    match s {
        "literal" => Ok(SoapUse::Literal),
        "encoded" => Ok(SoapUse::Encoded),
        other => Err(Error::Parse(format!("unknown soap use ({other})"))),
    }
}
