//! Schema model
//!
//! Parses XSD `<schema>` fragments embedded in (or imported from) a WSDL
//! into an arena of [`SchemaNode`]s indexed by qualified name. Children are
//! attached in declaration order. `<include>` merges declarations into the
//! including schema's target namespace, `<import>` keeps the imported
//! namespace distinct; both fetch through a [`SchemaLoader`] collaborator.
//!
//! Tag dispatch goes through an explicit [`BuilderRegistry`] passed in at
//! construction time, so extensions (like the SOAP-encoded array attribute
//! handling) never require process-wide mutable registration.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::document::{Document, Element};
use crate::error::{Error, Result};
use crate::namespaces::QName;
use crate::sudsobject::Value;
use crate::xsd::qualify;
use crate::{WSDL_NAMESPACE, XSD_NAMESPACE};

/// Index of a node within its owning [`Schema`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// Maximum occurs of a particle
pub const UNBOUNDED: u32 = u32::MAX;

/// XSD built-in primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XsdPrimitive {
    /// xs:string and the token-ish string types
    String,
    /// xs:boolean
    Boolean,
    /// xs:int, xs:long, xs:short, xs:byte, xs:integer and unsigned kin
    Int,
    /// xs:float, xs:double, xs:decimal
    Float,
    /// xs:date
    Date,
    /// xs:time
    Time,
    /// xs:dateTime
    DateTime,
    /// xs:anyType, matches anything
    AnyType,
}

impl XsdPrimitive {
    /// Local names registered for each primitive
    fn local_names(&self) -> &'static [&'static str] {
        match self {
            XsdPrimitive::String => &[
                "string",
                "normalizedString",
                "token",
                "anyURI",
                "QName",
                "NCName",
                "ID",
                "IDREF",
                "NMTOKEN",
                "language",
                "base64Binary",
                "hexBinary",
                "duration",
            ],
            XsdPrimitive::Boolean => &["boolean"],
            XsdPrimitive::Int => &[
                "int",
                "integer",
                "long",
                "short",
                "byte",
                "nonNegativeInteger",
                "nonPositiveInteger",
                "positiveInteger",
                "negativeInteger",
                "unsignedInt",
                "unsignedLong",
                "unsignedShort",
                "unsignedByte",
            ],
            XsdPrimitive::Float => &["float", "double", "decimal"],
            XsdPrimitive::Date => &["date"],
            XsdPrimitive::Time => &["time"],
            XsdPrimitive::DateTime => &["dateTime"],
            XsdPrimitive::AnyType => &["anyType", "anySimpleType", "any"],
        }
    }

    fn all() -> &'static [XsdPrimitive] {
        &[
            XsdPrimitive::String,
            XsdPrimitive::Boolean,
            XsdPrimitive::Int,
            XsdPrimitive::Float,
            XsdPrimitive::Date,
            XsdPrimitive::Time,
            XsdPrimitive::DateTime,
            XsdPrimitive::AnyType,
        ]
    }

    /// Translate a textual XML form into a native value.
    ///
    /// Translation is best effort: text that does not parse as the declared
    /// primitive is logged and passed through untranslated rather than
    /// dropped.
    pub fn translate(&self, text: &str) -> Value {
        let trimmed = text.trim();
        match self {
            XsdPrimitive::String | XsdPrimitive::AnyType => Value::Text(text.to_string()),
            XsdPrimitive::Boolean => match trimmed {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => {
                    debug!(text, "boolean translation failed, passing through");
                    Value::Text(text.to_string())
                }
            },
            XsdPrimitive::Int => match trimmed.parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => {
                    debug!(text, "integer translation failed, passing through");
                    Value::Text(text.to_string())
                }
            },
            XsdPrimitive::Float => match trimmed.parse::<f64>() {
                Ok(f) => Value::Float(f),
                Err(_) => {
                    debug!(text, "float translation failed, passing through");
                    Value::Text(text.to_string())
                }
            },
            XsdPrimitive::Date => match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
                Ok(d) => Value::Date(d),
                Err(_) => Value::Text(text.to_string()),
            },
            XsdPrimitive::Time => match NaiveTime::parse_from_str(trimmed, "%H:%M:%S") {
                Ok(t) => Value::Time(t),
                Err(_) => Value::Text(text.to_string()),
            },
            XsdPrimitive::DateTime => {
                // Zone designators are tolerated but not preserved.
                let candidate = trimmed.trim_end_matches('Z');
                match NaiveDateTime::parse_from_str(candidate, "%Y-%m-%dT%H:%M:%S") {
                    Ok(dt) => Value::DateTime(dt),
                    Err(_) => Value::Text(text.to_string()),
                }
            }
        }
    }

    /// The canonical xs type local name used for xsi:type emission
    pub fn type_name(&self) -> &'static str {
        match self {
            XsdPrimitive::String => "string",
            XsdPrimitive::Boolean => "boolean",
            XsdPrimitive::Int => "int",
            XsdPrimitive::Float => "float",
            XsdPrimitive::Date => "date",
            XsdPrimitive::Time => "time",
            XsdPrimitive::DateTime => "dateTime",
            XsdPrimitive::AnyType => "anyType",
        }
    }
}

/// Schema node variants
#[derive(Debug, Clone, PartialEq)]
pub enum NodeVariant {
    /// `<xs:element>`
    Element,
    /// `<xs:attribute>`
    Attribute,
    /// `<xs:simpleType>`
    SimpleType,
    /// `<xs:complexType>`
    ComplexType,
    /// `<xs:sequence>`
    Sequence,
    /// `<xs:choice>`
    Choice,
    /// `<xs:all>`
    All,
    /// `<xs:group>`
    Group,
    /// `<xs:attributeGroup>`
    AttributeGroup,
    /// `<xs:any>`
    Any,
    /// `<xs:anyAttribute>`
    AnyAttribute,
    /// `<xs:import>`
    Import,
    /// `<xs:include>`
    Include,
    /// `<xs:restriction>`
    Restriction,
    /// `<xs:extension>`
    Extension,
    /// `<xs:enumeration>`
    Enumeration,
    /// A built-in XSD primitive
    Builtin(XsdPrimitive),
}

/// One node of the schema graph.
///
/// Built once when the WSDL/XSD document is parsed and immutable
/// thereafter; owned exclusively by the [`Schema`] arena and referenced by
/// index everywhere else.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    /// The node variant
    pub variant: NodeVariant,
    /// Declared name, `None` for anonymous nodes
    pub name: Option<String>,
    /// Target namespace of the owning schema
    pub namespace: Option<String>,
    /// Parent node
    pub parent: Option<NodeId>,
    /// Child nodes in declaration order
    pub children: Vec<NodeId>,
    /// `ref="..."` attribute, qualified
    pub reference: Option<QName>,
    /// `type="..."` (or restriction/extension `base="..."`), qualified
    pub type_ref: Option<QName>,
    /// minOccurs
    pub min_occurs: u32,
    /// maxOccurs (UNBOUNDED for `unbounded`)
    pub max_occurs: u32,
    /// nillable
    pub nillable: bool,
    /// Whether the element form is qualified
    pub qualified: bool,
    /// `wsdl:arrayType` item type, qualified, with its `[]` suffix
    /// stripped; present when the node is the SOAP-encoding array
    /// attribute extension
    pub array_type: Option<QName>,
    /// `schemaLocation` of import/include nodes
    pub location: Option<String>,
}

impl SchemaNode {
    fn new(variant: NodeVariant) -> Self {
        Self {
            variant,
            name: None,
            namespace: None,
            parent: None,
            children: Vec::new(),
            reference: None,
            type_ref: None,
            min_occurs: 1,
            max_occurs: 1,
            nillable: false,
            qualified: true,
            array_type: None,
            location: None,
        }
    }

    /// The node's qualified name, when named
    pub fn qname(&self) -> Option<QName> {
        self.name
            .as_ref()
            .map(|n| QName::new(self.namespace.clone(), n.clone()))
    }

    /// True when more than one occurrence is allowed
    pub fn multi_occurrence(&self) -> bool {
        self.max_occurs > 1
    }

    /// True when the particle may be absent
    pub fn optional(&self) -> bool {
        self.min_occurs == 0
    }

    /// True for xs:any / xs:anyType nodes that match anything
    pub fn any(&self) -> bool {
        matches!(
            self.variant,
            NodeVariant::Any | NodeVariant::Builtin(XsdPrimitive::AnyType)
        )
    }

    /// True for built-in primitives
    pub fn builtin(&self) -> bool {
        matches!(self.variant, NodeVariant::Builtin(_))
    }
}

/// Parse context for one `<schema>` fragment
#[derive(Debug, Clone, Default)]
pub struct ParseCtx {
    /// targetNamespace of the fragment being parsed
    pub target_namespace: Option<String>,
    /// elementFormDefault="qualified"
    pub element_form_default: bool,
}

/// Constructor function for one schema tag
pub type Builder = fn(&ParseCtx, &Element) -> Result<SchemaNode>;

/// Explicit mapping from tag name to constructor function, consulted at
/// parse time. Last registration wins.
pub struct BuilderRegistry {
    builders: HashMap<&'static str, Builder>,
}

impl BuilderRegistry {
    /// An empty registry
    pub fn empty() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// The standard tag set plus the SOAP array attribute extension
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register("element", build_element);
        registry.register("attribute", build_soap_array_attribute);
        registry.register("simpleType", build_simple_type);
        registry.register("complexType", build_complex_type);
        registry.register("sequence", build_container(NodeVariant::Sequence));
        registry.register("choice", build_container(NodeVariant::Choice));
        registry.register("all", build_container(NodeVariant::All));
        registry.register("group", build_group);
        registry.register("attributeGroup", build_attribute_group);
        registry.register("any", build_any);
        registry.register("anyAttribute", build_any_attribute);
        registry.register("import", build_import);
        registry.register("include", build_include);
        registry.register("restriction", build_derivation(NodeVariant::Restriction));
        registry.register("extension", build_derivation(NodeVariant::Extension));
        registry.register("enumeration", build_enumeration);
        registry
    }

    /// Register (or replace) the constructor for a tag
    pub fn register(&mut self, tag: &'static str, builder: Builder) {
        self.builders.insert(tag, builder);
    }

    fn get(&self, tag: &str) -> Option<&Builder> {
        self.builders.get(tag)
    }
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn common(variant: NodeVariant, ctx: &ParseCtx, el: &Element) -> Result<SchemaNode> {
    let mut node = SchemaNode::new(variant);
    node.name = el.get("name").map(|s| s.to_string());
    node.namespace = ctx.target_namespace.clone();
    node.qualified = ctx.element_form_default;
    if let Some(r) = el.get("ref") {
        node.reference = Some(qualify(r, el, ctx.target_namespace.as_deref())?);
    }
    if let Some(t) = el.get("type") {
        node.type_ref = Some(qualify(t, el, ctx.target_namespace.as_deref())?);
    }
    if let Some(min) = el.get("minOccurs") {
        node.min_occurs = min
            .parse()
            .map_err(|_| Error::Parse(format!("invalid minOccurs: {}", min)))?;
    }
    if let Some(max) = el.get("maxOccurs") {
        node.max_occurs = if max == "unbounded" {
            UNBOUNDED
        } else {
            max.parse()
                .map_err(|_| Error::Parse(format!("invalid maxOccurs: {}", max)))?
        };
    }
    node.nillable = el.get("nillable") == Some("true");
    Ok(node)
}

fn build_element(ctx: &ParseCtx, el: &Element) -> Result<SchemaNode> {
    let mut node = common(NodeVariant::Element, ctx, el)?;
    if let Some(form) = el.get("form") {
        node.qualified = form == "qualified";
    }
    Ok(node)
}

/// Builder for `<xs:attribute>` that also recognizes the WSDL
/// `wsdl:arrayType` extension used by SOAP section-5 encoded arrays.
fn build_soap_array_attribute(ctx: &ParseCtx, el: &Element) -> Result<SchemaNode> {
    let mut node = common(NodeVariant::Attribute, ctx, el)?;
    if let Some(aty) = el.get_ns("arrayType", WSDL_NAMESPACE) {
        let item = aty.strip_suffix("[]").unwrap_or(aty);
        node.array_type = Some(qualify(item, el, ctx.target_namespace.as_deref())?);
    }
    Ok(node)
}

fn build_simple_type(ctx: &ParseCtx, el: &Element) -> Result<SchemaNode> {
    common(NodeVariant::SimpleType, ctx, el)
}

fn build_complex_type(ctx: &ParseCtx, el: &Element) -> Result<SchemaNode> {
    common(NodeVariant::ComplexType, ctx, el)
}

fn build_container(variant: NodeVariant) -> Builder {
    match variant {
        NodeVariant::Sequence => |ctx, el| common(NodeVariant::Sequence, ctx, el),
        NodeVariant::Choice => |ctx, el| common(NodeVariant::Choice, ctx, el),
        _ => |ctx, el| common(NodeVariant::All, ctx, el),
    }
}

fn build_group(ctx: &ParseCtx, el: &Element) -> Result<SchemaNode> {
    common(NodeVariant::Group, ctx, el)
}

fn build_attribute_group(ctx: &ParseCtx, el: &Element) -> Result<SchemaNode> {
    common(NodeVariant::AttributeGroup, ctx, el)
}

fn build_any(ctx: &ParseCtx, el: &Element) -> Result<SchemaNode> {
    common(NodeVariant::Any, ctx, el)
}

fn build_any_attribute(ctx: &ParseCtx, el: &Element) -> Result<SchemaNode> {
    common(NodeVariant::AnyAttribute, ctx, el)
}

fn build_import(ctx: &ParseCtx, el: &Element) -> Result<SchemaNode> {
    let mut node = common(NodeVariant::Import, ctx, el)?;
    // The imported namespace is distinct from the importing one.
    node.namespace = el.get("namespace").map(|s| s.to_string());
    node.location = el.get("schemaLocation").map(|s| s.to_string());
    Ok(node)
}

fn build_include(ctx: &ParseCtx, el: &Element) -> Result<SchemaNode> {
    let mut node = common(NodeVariant::Include, ctx, el)?;
    node.location = el.get("schemaLocation").map(|s| s.to_string());
    Ok(node)
}

fn build_derivation(variant: NodeVariant) -> Builder {
    match variant {
        NodeVariant::Restriction => |ctx: &ParseCtx, el: &Element| {
            let mut node = common(NodeVariant::Restriction, ctx, el)?;
            if let Some(base) = el.get("base") {
                node.type_ref = Some(qualify(base, el, ctx.target_namespace.as_deref())?);
            }
            Ok(node)
        },
        _ => |ctx: &ParseCtx, el: &Element| {
            let mut node = common(NodeVariant::Extension, ctx, el)?;
            if let Some(base) = el.get("base") {
                node.type_ref = Some(qualify(base, el, ctx.target_namespace.as_deref())?);
            }
            Ok(node)
        },
    }
}

fn build_enumeration(ctx: &ParseCtx, el: &Element) -> Result<SchemaNode> {
    let mut node = common(NodeVariant::Enumeration, ctx, el)?;
    node.name = el.get("value").map(|s| s.to_string());
    Ok(node)
}

/// Collaborator that fetches referenced schema documents for
/// `<import>`/`<include>` resolution. Fetch failures propagate unchanged.
pub trait SchemaLoader {
    /// Open the document at the given location
    fn load(&mut self, location: &str) -> Result<Document>;
}

/// A loader that refuses every fetch, for schemas known to be
/// self-contained.
pub struct NoLoader;

impl SchemaLoader for NoLoader {
    fn load(&mut self, location: &str) -> Result<Document> {
        Err(Error::Transport(format!(
            "no loader available for schema location: {}",
            location
        )))
    }
}

type GlobalIndex = IndexMap<(String, Option<String>), NodeId>;

/// The schema model: an arena of nodes plus global indices keyed by
/// (local name, namespace URI).
pub struct Schema {
    nodes: Vec<SchemaNode>,
    /// Global element declarations
    pub elements: GlobalIndex,
    /// Global type definitions (builtins included)
    pub types: GlobalIndex,
    /// Global attribute declarations
    pub attributes: GlobalIndex,
    /// Global model/attribute groups
    pub groups: GlobalIndex,
    registry: BuilderRegistry,
    loaded_locations: HashSet<String>,
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("nodes", &self.nodes.len())
            .field("elements", &self.elements.len())
            .field("types", &self.types.len())
            .finish()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl Schema {
    /// Create a schema with the standard builder registry
    pub fn new() -> Self {
        Self::with_registry(BuilderRegistry::standard())
    }

    /// Create a schema with an explicit builder registry
    pub fn with_registry(registry: BuilderRegistry) -> Self {
        let mut schema = Self {
            nodes: Vec::new(),
            elements: IndexMap::new(),
            types: IndexMap::new(),
            attributes: IndexMap::new(),
            groups: IndexMap::new(),
            registry,
            loaded_locations: HashSet::new(),
        };
        schema.register_builtins();
        schema
    }

    fn register_builtins(&mut self) {
        for primitive in XsdPrimitive::all() {
            for local in primitive.local_names() {
                let mut node = SchemaNode::new(NodeVariant::Builtin(*primitive));
                node.name = Some(local.to_string());
                node.namespace = Some(XSD_NAMESPACE.to_string());
                let id = self.add(node);
                self.types
                    .insert((local.to_string(), Some(XSD_NAMESPACE.to_string())), id);
            }
        }
    }

    fn add(&mut self, node: SchemaNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Borrow a node by id
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    fn key(qname: &QName) -> (String, Option<String>) {
        (qname.local_name.clone(), qname.namespace.clone())
    }

    /// Look up a global element declaration
    pub fn element(&self, qname: &QName) -> Option<NodeId> {
        self.elements.get(&Self::key(qname)).copied()
    }

    /// Look up a global type definition
    pub fn xsd_type(&self, qname: &QName) -> Option<NodeId> {
        self.types.get(&Self::key(qname)).copied()
    }

    /// Look up a global attribute declaration
    pub fn attribute(&self, qname: &QName) -> Option<NodeId> {
        self.attributes.get(&Self::key(qname)).copied()
    }

    /// Look up a global model or attribute group
    pub fn group(&self, qname: &QName) -> Option<NodeId> {
        self.groups.get(&Self::key(qname)).copied()
    }

    /// Parse one `<schema>` fragment into the model.
    pub fn add_schema(&mut self, root: &Element, loader: &mut dyn SchemaLoader) -> Result<()> {
        let ctx = ParseCtx {
            target_namespace: root.get("targetNamespace").map(|s| s.to_string()),
            element_form_default: root.get("elementFormDefault") == Some("qualified"),
        };
        self.add_fragment(root, &ctx, loader)
    }

    fn add_fragment(
        &mut self,
        root: &Element,
        ctx: &ParseCtx,
        loader: &mut dyn SchemaLoader,
    ) -> Result<()> {
        if root.name != "schema" {
            return Err(Error::Parse(format!(
                "expected <schema>, found <{}>",
                root.qname()
            )));
        }
        for child in &root.children {
            self.build_node(child, None, ctx, loader)?;
        }
        Ok(())
    }

    fn build_node(
        &mut self,
        el: &Element,
        parent: Option<NodeId>,
        ctx: &ParseCtx,
        loader: &mut dyn SchemaLoader,
    ) -> Result<()> {
        match el.name.as_str() {
            "annotation" | "documentation" | "notation" | "key" | "keyref" | "unique" => {
                return Ok(())
            }
            // Transparent content wrappers: children attach to the
            // enclosing type directly.
            "complexContent" | "simpleContent" => {
                for child in &el.children {
                    self.build_node(child, parent, ctx, loader)?;
                }
                return Ok(());
            }
            _ => {}
        }

        let builder = match self.registry.get(&el.name) {
            Some(b) => *b,
            None => {
                debug!(tag = %el.name, "no builder for schema tag, skipped");
                return Ok(());
            }
        };
        let mut node = builder(ctx, el)?;
        // Import and include nodes drive a fetch instead of entering the
        // arena; the registered builder decides what they mean.
        match node.variant {
            NodeVariant::Import => return self.process_import(&node, loader),
            NodeVariant::Include => return self.process_include(&node, ctx, loader),
            _ => {}
        }
        node.parent = parent;
        let qname = node.qname();
        let variant = node.variant.clone();
        let id = self.add(node);

        match parent {
            Some(pid) => self.nodes[pid.0].children.push(id),
            None => {
                // Top-level declarations go into the global indices.
                if let Some(qname) = qname {
                    let key = Self::key(&qname);
                    match variant {
                        NodeVariant::Element => {
                            self.elements.insert(key, id);
                        }
                        NodeVariant::Attribute => {
                            self.attributes.insert(key, id);
                        }
                        NodeVariant::SimpleType | NodeVariant::ComplexType => {
                            self.types.insert(key, id);
                        }
                        NodeVariant::Group | NodeVariant::AttributeGroup => {
                            self.groups.insert(key, id);
                        }
                        _ => {}
                    }
                }
            }
        }

        for child in &el.children {
            self.build_node(child, Some(id), ctx, loader)?;
        }
        Ok(())
    }

    fn process_import(&mut self, node: &SchemaNode, loader: &mut dyn SchemaLoader) -> Result<()> {
        let location = match &node.location {
            Some(l) => l.clone(),
            // A namespace-only import introduces no declarations.
            None => return Ok(()),
        };
        if !self.loaded_locations.insert(location.clone()) {
            debug!(location, "schema already loaded, skipped");
            return Ok(());
        }
        let document = loader.load(&location)?;
        let root = document
            .root()
            .ok_or_else(|| Error::Parse(format!("empty schema document: {}", location)))?;
        // Imported schemas keep their own target namespace.
        self.add_schema(root, loader)
    }

    fn process_include(
        &mut self,
        node: &SchemaNode,
        ctx: &ParseCtx,
        loader: &mut dyn SchemaLoader,
    ) -> Result<()> {
        let location = node.location.as_deref().ok_or_else(|| {
            Error::Parse("include requires a schemaLocation attribute".to_string())
        })?;
        if !self.loaded_locations.insert(location.to_string()) {
            debug!(location, "schema already loaded, skipped");
            return Ok(());
        }
        let document = loader.load(location)?;
        let root = document
            .root()
            .ok_or_else(|| Error::Parse(format!("empty schema document: {}", location)))?;
        if root.name != "schema" {
            return Err(Error::Parse(format!(
                "expected <schema>, found <{}>",
                root.qname()
            )));
        }
        // Included declarations merge into the including target namespace.
        let merged = ParseCtx {
            target_namespace: ctx.target_namespace.clone(),
            element_form_default: root.get("elementFormDefault") == Some("qualified")
                || ctx.element_form_default,
        };
        self.add_fragment(root, &merged, loader)
    }

    /// The element declarations of a type, flattened through
    /// sequence/choice/all/group containers and extension bases
    /// (base members first). Cycle-guarded.
    pub fn type_elements(&self, type_id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.collect(type_id, &mut out, &mut seen, true);
        out
    }

    /// The attribute declarations of a type, flattened the same way.
    pub fn type_attributes(&self, type_id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.collect(type_id, &mut out, &mut seen, false);
        out
    }

    fn collect(&self, id: NodeId, out: &mut Vec<NodeId>, seen: &mut HashSet<NodeId>, elems: bool) {
        if !seen.insert(id) {
            return;
        }
        let node = self.node(id);
        for &child_id in &node.children {
            let child = self.node(child_id);
            match child.variant {
                NodeVariant::Element | NodeVariant::Any if elems => out.push(child_id),
                NodeVariant::Attribute | NodeVariant::AnyAttribute if !elems => out.push(child_id),
                NodeVariant::Sequence | NodeVariant::Choice | NodeVariant::All => {
                    self.collect(child_id, out, seen, elems)
                }
                NodeVariant::Group | NodeVariant::AttributeGroup => {
                    match child.reference.as_ref().and_then(|r| self.group(r)) {
                        Some(target) => self.collect(target, out, seen, elems),
                        None => self.collect(child_id, out, seen, elems),
                    }
                }
                NodeVariant::Restriction => self.collect(child_id, out, seen, elems),
                NodeVariant::Extension => {
                    // Base members come before the extension's own.
                    if let Some(base) = child.type_ref.as_ref().and_then(|b| self.xsd_type(b)) {
                        self.collect(base, out, seen, elems);
                    }
                    self.collect(child_id, out, seen, elems);
                }
                _ => {}
            }
        }
    }

    /// The built-in primitive a type boils down to, chasing simple-type
    /// restriction bases. `None` for complex types.
    pub fn primitive_of(&self, type_id: NodeId) -> Option<XsdPrimitive> {
        let mut seen = HashSet::new();
        let mut current = type_id;
        loop {
            if !seen.insert(current) {
                return None;
            }
            let node = self.node(current);
            match &node.variant {
                NodeVariant::Builtin(p) => return Some(*p),
                NodeVariant::SimpleType => {
                    // Follow the restriction/extension base.
                    let base = node.children.iter().find_map(|&c| {
                        let child = self.node(c);
                        match child.variant {
                            NodeVariant::Restriction | NodeVariant::Extension => {
                                child.type_ref.as_ref().and_then(|b| self.xsd_type(b))
                            }
                            _ => None,
                        }
                    });
                    match base {
                        Some(b) => current = b,
                        None => return Some(XsdPrimitive::String),
                    }
                }
                _ => {
                    match node.type_ref.as_ref().and_then(|t| self.xsd_type(t)) {
                        Some(t) => current = t,
                        None => return None,
                    }
                }
            }
        }
    }

    /// Translate a textual value through a type's primitive.
    ///
    /// Unknown or complex types pass the text through unmodified.
    pub fn translate(&self, type_id: NodeId, text: &str) -> Value {
        match self.primitive_of(type_id) {
            Some(primitive) => primitive.translate(text),
            None => {
                warn!(?type_id, "no primitive for type, text passed through");
                Value::Text(text.to_string())
            }
        }
    }
}
