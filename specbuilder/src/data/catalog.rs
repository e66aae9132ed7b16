//! Built-in node kinds.
//!
//! Every kind is a [`FormSchema`]: the tag it writes into `type`, its scalar
//! fields and its nested slots. The legal key set of a fragment is derived
//! from the schema, so adding a field here is enough for pruning to keep it.

use clap::ValueEnum;

use crate::{
    data::{
        field::{FieldDef, FieldKind},
        node::TYPE_KEY,
    },
    editor::registry::TypeRegistry,
};

/// A group of tags one dispatcher chooses between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Family {
    /// Search query specs (`all`, `contains`, ...).
    Search,
    /// Aggregations (`cardinality`, `count`, ...).
    Aggregation,
    /// Dimension specs, hosted inside aggregations.
    Dimension,
}

impl Family {
    pub fn schemas(self) -> &'static [&'static FormSchema] {
        match self {
            Family::Search => SEARCH,
            Family::Aggregation => AGGREGATION,
            Family::Dimension => DIMENSION,
        }
    }

    /// A fresh registry holding this family's built-in tags.
    pub fn registry(self) -> TypeRegistry {
        TypeRegistry::with_builtins(self.schemas())
    }
}

/// How a nested slot holds its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// One nested fragment edited through a dispatcher.
    Single(Family),
    /// Ordered list of fragments, each edited through its own dispatcher.
    List(Family),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotDef {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: SlotKind,
}

/// Declaration of a node kind.
#[derive(Debug, PartialEq, Eq)]
pub struct FormSchema {
    /// Discriminator written into the fragment.
    pub tag: &'static str,
    /// Label offered by pickers.
    pub label: &'static str,
    pub fields: &'static [FieldDef],
    pub slots: &'static [SlotDef],
}

impl FormSchema {
    /// `type` plus every declared field and slot key.
    pub fn legal_keys(&self) -> Vec<&'static str> {
        std::iter::once(TYPE_KEY)
            .chain(self.fields.iter().map(|f| f.name))
            .chain(self.slots.iter().map(|s| s.key))
            .collect()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn slot(&self, key: &str) -> Option<&SlotDef> {
        self.slots.iter().find(|s| s.key == key)
    }
}

const OUTPUT_TYPES: &[&str] = &["STRING", "LONG", "FLOAT", "DOUBLE"];

const NAME: FieldDef = FieldDef::new("name", "Name", FieldKind::Text)
    .describe("Output name for the aggregated value");
const FIELD_NAME: FieldDef = FieldDef::new("fieldName", "Field", FieldKind::Text)
    .describe("Name of the metric column to aggregate over");
const CASE_SENSITIVE: FieldDef =
    FieldDef::new("caseSensitive", "Case sensitive", FieldKind::Boolean);
const ROUND: FieldDef = FieldDef::new("round", "Round", FieldKind::Boolean)
    .describe("Set to true to round off estimated values to whole numbers");
const DELEGATE: SlotDef = SlotDef {
    key: "delegate",
    label: "Delegate",
    kind: SlotKind::Single(Family::Dimension),
};

// Search query specs.

pub static ALL: FormSchema = FormSchema {
    tag: "all",
    label: "All",
    fields: &[],
    slots: &[],
};

pub static CONTAINS: FormSchema = FormSchema {
    tag: "contains",
    label: "Contains",
    fields: &[
        FieldDef::new("value", "Value", FieldKind::Text),
        CASE_SENSITIVE,
    ],
    slots: &[],
};

pub static FRAGMENT: FormSchema = FormSchema {
    tag: "fragment",
    label: "Fragment",
    fields: &[
        FieldDef::new("values", "Values", FieldKind::TextList)
            .describe("Every fragment must be contained in the dimension value"),
        CASE_SENSITIVE,
    ],
    slots: &[],
};

pub static INSENSITIVE_CONTAINS: FormSchema = FormSchema {
    tag: "insensitivecontains",
    label: "InsensitiveContains",
    fields: &[FieldDef::new("value", "Value", FieldKind::Text)],
    slots: &[],
};

pub static REGEX: FormSchema = FormSchema {
    tag: "regex",
    label: "Regex",
    fields: &[FieldDef::new("pattern", "Pattern", FieldKind::Text)],
    slots: &[],
};

static SEARCH: &[&FormSchema] = &[&ALL, &CONTAINS, &FRAGMENT, &INSENSITIVE_CONTAINS, &REGEX];

// Aggregations.

pub static CARDINALITY: FormSchema = FormSchema {
    tag: "cardinality",
    label: "Cardinality",
    fields: &[
        NAME,
        FieldDef::new("byRow", "By row", FieldKind::Boolean).describe(
            "Set to true to computes the cardinality by row, i.e. the cardinality of distinct dimension combinations",
        ),
        ROUND,
    ],
    slots: &[SlotDef {
        key: "fields",
        label: "Dimensions",
        kind: SlotKind::List(Family::Dimension),
    }],
};

pub static COUNT: FormSchema = FormSchema {
    tag: "count",
    label: "Count",
    fields: &[NAME],
    slots: &[],
};

pub static LONG_SUM: FormSchema = metric("longSum", "LongSum");
pub static DOUBLE_SUM: FormSchema = metric("doubleSum", "DoubleSum");
pub static LONG_MIN: FormSchema = metric("longMin", "LongMin");
pub static LONG_MAX: FormSchema = metric("longMax", "LongMax");
pub static DOUBLE_MIN: FormSchema = metric("doubleMin", "DoubleMin");
pub static DOUBLE_MAX: FormSchema = metric("doubleMax", "DoubleMax");

pub static HYPER_UNIQUE: FormSchema = FormSchema {
    tag: "hyperUnique",
    label: "HyperUnique",
    fields: &[
        NAME,
        FIELD_NAME,
        FieldDef::new("isInputHyperUnique", "Input is HyperUnique", FieldKind::Boolean),
        ROUND,
    ],
    slots: &[],
};

pub static THETA_SKETCH: FormSchema = FormSchema {
    tag: "thetaSketch",
    label: "ThetaSketch",
    fields: &[
        NAME,
        FIELD_NAME,
        FieldDef::new("isInputThetaSketch", "Input is ThetaSketch", FieldKind::Boolean),
        FieldDef::new("size", "Size", FieldKind::Number)
            .describe("Maximum number of entries retained by the sketch, a power of 2"),
    ],
    slots: &[],
};

const METRIC_FIELDS: &[FieldDef] = &[NAME, FIELD_NAME];

const fn metric(tag: &'static str, label: &'static str) -> FormSchema {
    FormSchema {
        tag,
        label,
        fields: METRIC_FIELDS,
        slots: &[],
    }
}

static AGGREGATION: &[&FormSchema] = &[
    &CARDINALITY,
    &COUNT,
    &LONG_SUM,
    &DOUBLE_SUM,
    &LONG_MIN,
    &LONG_MAX,
    &DOUBLE_MIN,
    &DOUBLE_MAX,
    &HYPER_UNIQUE,
    &THETA_SKETCH,
];

// Dimension specs.

pub static DEFAULT_DIMENSION: FormSchema = FormSchema {
    tag: "default",
    label: "Default",
    fields: &[
        FieldDef::new("dimension", "Dimension", FieldKind::Text),
        FieldDef::new("outputName", "Output name", FieldKind::Text),
        FieldDef::new("outputType", "Output type", FieldKind::Choice(OUTPUT_TYPES)),
    ],
    slots: &[],
};

pub static LIST_FILTERED: FormSchema = FormSchema {
    tag: "listFiltered",
    label: "ListFiltered",
    fields: &[
        FieldDef::new("values", "Values", FieldKind::TextList),
        FieldDef::new("isWhitelist", "Whitelist", FieldKind::Boolean),
    ],
    slots: &[DELEGATE],
};

pub static PREFIX_FILTERED: FormSchema = FormSchema {
    tag: "prefixFiltered",
    label: "PrefixFiltered",
    fields: &[FieldDef::new("prefix", "Prefix", FieldKind::Text)],
    slots: &[DELEGATE],
};

pub static REGEX_FILTERED: FormSchema = FormSchema {
    tag: "regexFiltered",
    label: "RegexFiltered",
    fields: &[FieldDef::new("pattern", "Pattern", FieldKind::Text)],
    slots: &[DELEGATE],
};

static DIMENSION: &[&FormSchema] = &[
    &DEFAULT_DIMENSION,
    &LIST_FILTERED,
    &PREFIX_FILTERED,
    &REGEX_FILTERED,
];
