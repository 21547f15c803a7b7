//! # Domain Types
//!
//! Core domain types used throughout the STO CRM order flow.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   ClientRef     │   │     CarRef      │   │   CatalogRef    │       │
//! │  │  (opaque, ERP)  │   │  (opaque, ERP)  │   │  (opaque, ERP)  │       │
//! │  └─────────────────┘   └────────┬────────┘   └────────┬────────┘       │
//! │                                 │                     │                 │
//! │                        ┌────────▼────────┐   ┌────────▼────────┐       │
//! │                        │      Car        │   │  CatalogEntry   │       │
//! │                        │  name, vin      │   │  ref, name      │       │
//! │                        │  owner (assoc)  │   └────────┬────────┘       │
//! │                        └─────────────────┘            │ snapshot        │
//! │                                              ┌────────▼────────┐       │
//! │                                              │ WorkLine        │       │
//! │                                              │ PartLine        │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Line items copy `(ref, name)` out of a catalog entry at the moment of
//! selection. They never point back at the entry, so later catalog edits
//! leave existing lines untouched.

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Opaque References
// =============================================================================

macro_rules! opaque_ref {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier.
            pub fn new(value: impl Into<String>) -> Self {
                $name(value.into())
            }

            /// Returns the raw identifier.
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the wrapper, returning the raw identifier.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                $name(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_ref! {
    /// Identifier of a client (counterparty) held by the ERP.
    ClientRef
}

opaque_ref! {
    /// Identifier of a vehicle held by the ERP.
    CarRef
}

opaque_ref! {
    /// Identifier of an order document already stored in the ERP.
    OrderRef
}

opaque_ref! {
    /// Identifier of a catalog record: work type, part, workshop, repair type
    /// or employee.
    CatalogRef
}

// =============================================================================
// Catalog Kind
// =============================================================================

/// Which external catalog a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogKind {
    /// Labor types (Автоработы).
    Works,
    /// Parts and goods (Номенклатура).
    Parts,
    /// Vehicles.
    Cars,
    /// Counterparties.
    Clients,
    /// Shop floors.
    Workshops,
    /// Repair categories.
    RepairTypes,
    /// Staff, used for the master field.
    Employees,
    /// Order states an order can be moved to.
    OrderStatuses,
    /// Legal entities of the shop.
    Organizations,
}

impl CatalogKind {
    /// All kinds, in the order the front end lists them.
    pub const ALL: [CatalogKind; 9] = [
        CatalogKind::Works,
        CatalogKind::Parts,
        CatalogKind::Cars,
        CatalogKind::Clients,
        CatalogKind::Workshops,
        CatalogKind::RepairTypes,
        CatalogKind::Employees,
        CatalogKind::OrderStatuses,
        CatalogKind::Organizations,
    ];

    /// Path segment / wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogKind::Works => "works",
            CatalogKind::Parts => "parts",
            CatalogKind::Cars => "cars",
            CatalogKind::Clients => "clients",
            CatalogKind::Workshops => "workshops",
            CatalogKind::RepairTypes => "repair-types",
            CatalogKind::Employees => "employees",
            CatalogKind::OrderStatuses => "order-statuses",
            CatalogKind::Organizations => "organizations",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CatalogKind {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        CatalogKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| crate::error::ValidationError::NotAllowed {
                field: "catalog".to_string(),
                allowed: CatalogKind::ALL.iter().map(|k| k.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Catalog Entry
// =============================================================================

/// One row returned by a catalog search.
///
/// `ref` and `name` are always present. The optional fields carry whatever the
/// catalog has beyond that: a code for every catalog, an article number for
/// parts, a VIN for cars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogEntry {
    #[serde(rename = "ref")]
    pub reference: CatalogRef,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
}

impl CatalogEntry {
    /// Creates an entry with only `ref` and `name`.
    pub fn new(reference: impl Into<CatalogRef>, name: impl Into<String>) -> Self {
        CatalogEntry {
            reference: reference.into(),
            name: name.into(),
            code: None,
            article: None,
            vin: None,
        }
    }
}

// =============================================================================
// Car
// =============================================================================

/// A vehicle as seen from the order form.
///
/// Ownership is an association: the car record points at its owner, the
/// client record does not embed its cars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Car {
    #[serde(rename = "ref")]
    pub reference: CarRef,

    /// Display name ("Toyota Camry").
    pub name: String,

    /// VIN, when the ERP has one.
    pub vin: Option<String>,

    /// Registration plate, when the ERP has one.
    pub plate: Option<String>,

    /// Associated client.
    pub owner: Option<ClientRef>,
}

// =============================================================================
// Line Kind
// =============================================================================

/// Which of the two line sequences an index addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum LineKind {
    #[serde(rename = "works")]
    Work,
    #[serde(rename = "parts")]
    Part,
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineKind::Work => f.write_str("works"),
            LineKind::Part => f.write_str("parts"),
        }
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// A labor line on a draft order.
///
/// ## Defaults
/// `qty = 1`, `price = 0`. A zero price is a valid in-progress state: the
/// operator still has to type it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WorkLine {
    #[serde(rename = "ref")]
    pub reference: CatalogRef,
    /// Name at time of selection (frozen).
    pub name: String,
    pub qty: f64,
    pub price: f64,
}

impl WorkLine {
    /// Snapshots a catalog entry into a fresh work line.
    pub fn from_entry(entry: &CatalogEntry) -> Self {
        WorkLine {
            reference: entry.reference.clone(),
            name: entry.name.clone(),
            qty: 1.0,
            price: 0.0,
        }
    }
}

/// A part (goods) line on a draft order.
///
/// ## Defaults
/// `qty = 1`, `price = 0`, `discount = 0`. `discount` is a percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PartLine {
    #[serde(rename = "ref")]
    pub reference: CatalogRef,
    /// Name at time of selection (frozen).
    pub name: String,
    pub qty: f64,
    pub price: f64,
    pub discount: f64,
}

impl PartLine {
    /// Snapshots a catalog entry into a fresh part line.
    pub fn from_entry(entry: &CatalogEntry) -> Self {
        PartLine {
            reference: entry.reference.clone(),
            name: entry.name.clone(),
            qty: 1.0,
            price: 0.0,
            discount: 0.0,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
