//! Actions of the inventory reducers.
//!
//! Every operation is a pair: a *command* that begins it (carrying the
//! caller's [`CorrelationId`]) and a *resolution* produced by the effect
//! when the round-trip finishes (carrying the issued [`RequestTicket`] and
//! the already classified result).

use crate::error::ErrorEnvelope;
use crate::lifecycle::RequestTicket;
use crate::types::{
    CorrelationId, MaterialsReplacement, NewProduct, NewRawMaterial, Product, ProductId,
    ProductMaterial, ProductPatch, ProductionSuggestion, RawMaterial, RawMaterialId,
};

/// Raw materials collection actions
#[derive(Debug, Clone, PartialEq)]
pub enum RawMaterialsAction {
    // Commands
    /// Load the collection
    Fetch {
        /// Caller correlation ID
        correlation_id: CorrelationId,
    },
    /// Create a raw material
    Create {
        /// Caller correlation ID
        correlation_id: CorrelationId,
        /// Payload
        input: NewRawMaterial,
    },
    /// Update a raw material's name and stock
    Update {
        /// Caller correlation ID
        correlation_id: CorrelationId,
        /// New state of the raw material
        material: RawMaterial,
    },
    /// Delete a raw material
    Delete {
        /// Caller correlation ID
        correlation_id: CorrelationId,
        /// Target
        id: RawMaterialId,
    },

    // Resolutions
    /// Fetch finished
    Fetched {
        /// Issued ticket
        ticket: RequestTicket,
        /// Server list or classified failure
        result: Result<Vec<RawMaterial>, ErrorEnvelope>,
    },
    /// Create finished
    Created {
        /// Issued ticket
        ticket: RequestTicket,
        /// Created entity or classified failure
        result: Result<RawMaterial, ErrorEnvelope>,
    },
    /// Update finished
    Updated {
        /// Issued ticket
        ticket: RequestTicket,
        /// Target of the update
        id: RawMaterialId,
        /// Updated entity or classified failure
        result: Result<RawMaterial, ErrorEnvelope>,
    },
    /// Delete finished
    Deleted {
        /// Issued ticket
        ticket: RequestTicket,
        /// Target of the delete
        id: RawMaterialId,
        /// Classified failure, if any
        result: Result<(), ErrorEnvelope>,
    },
}

impl RawMaterialsAction {
    /// Correlation ID of the command or of the ticket
    #[must_use]
    pub const fn correlation_id(&self) -> CorrelationId {
        match self {
            Self::Fetch { correlation_id }
            | Self::Create { correlation_id, .. }
            | Self::Update { correlation_id, .. }
            | Self::Delete { correlation_id, .. } => *correlation_id,
            Self::Fetched { ticket, .. }
            | Self::Created { ticket, .. }
            | Self::Updated { ticket, .. }
            | Self::Deleted { ticket, .. } => ticket.correlation_id,
        }
    }

    /// Whether this action ends an operation
    #[must_use]
    pub const fn is_resolution(&self) -> bool {
        matches!(
            self,
            Self::Fetched { .. } | Self::Created { .. } | Self::Updated { .. } | Self::Deleted { .. }
        )
    }
}

/// Products collection actions
#[derive(Debug, Clone, PartialEq)]
pub enum ProductsAction {
    // Commands
    /// Load the collection
    Fetch {
        /// Caller correlation ID
        correlation_id: CorrelationId,
    },
    /// Create a product with its materials
    Create {
        /// Caller correlation ID
        correlation_id: CorrelationId,
        /// Payload
        input: NewProduct,
    },
    /// Update a product's name and/or price
    Update {
        /// Caller correlation ID
        correlation_id: CorrelationId,
        /// Target
        id: ProductId,
        /// Fields to change
        patch: ProductPatch,
    },
    /// Delete a product
    Delete {
        /// Caller correlation ID
        correlation_id: CorrelationId,
        /// Target
        id: ProductId,
    },
    /// Replace a product's material list
    ReplaceMaterials {
        /// Caller correlation ID
        correlation_id: CorrelationId,
        /// Target product
        product_id: ProductId,
        /// Complete new list
        replacement: MaterialsReplacement,
    },
    /// Remove one material from a product
    DeleteMaterial {
        /// Caller correlation ID
        correlation_id: CorrelationId,
        /// Target product
        product_id: ProductId,
        /// Material to remove
        material_id: RawMaterialId,
    },

    // Resolutions
    /// Fetch finished
    Fetched {
        /// Issued ticket
        ticket: RequestTicket,
        /// Server list or classified failure
        result: Result<Vec<Product>, ErrorEnvelope>,
    },
    /// Create finished
    Created {
        /// Issued ticket
        ticket: RequestTicket,
        /// Created entity or classified failure
        result: Result<Product, ErrorEnvelope>,
    },
    /// Update finished
    Updated {
        /// Issued ticket
        ticket: RequestTicket,
        /// Target of the update
        id: ProductId,
        /// Updated entity or classified failure
        result: Result<Product, ErrorEnvelope>,
    },
    /// Delete finished
    Deleted {
        /// Issued ticket
        ticket: RequestTicket,
        /// Target of the delete
        id: ProductId,
        /// Classified failure, if any
        result: Result<(), ErrorEnvelope>,
    },
    /// Materials replacement finished
    MaterialsReplaced {
        /// Issued ticket
        ticket: RequestTicket,
        /// Target product
        product_id: ProductId,
        /// Server-returned list or classified failure
        result: Result<Vec<ProductMaterial>, ErrorEnvelope>,
    },
    /// Material removal finished
    MaterialDeleted {
        /// Issued ticket
        ticket: RequestTicket,
        /// Target product
        product_id: ProductId,
        /// Removed material
        material_id: RawMaterialId,
        /// Classified failure, if any
        result: Result<(), ErrorEnvelope>,
    },
}

impl ProductsAction {
    /// Correlation ID of the command or of the ticket
    #[must_use]
    pub const fn correlation_id(&self) -> CorrelationId {
        match self {
            Self::Fetch { correlation_id }
            | Self::Create { correlation_id, .. }
            | Self::Update { correlation_id, .. }
            | Self::Delete { correlation_id, .. }
            | Self::ReplaceMaterials { correlation_id, .. }
            | Self::DeleteMaterial { correlation_id, .. } => *correlation_id,
            Self::Fetched { ticket, .. }
            | Self::Created { ticket, .. }
            | Self::Updated { ticket, .. }
            | Self::Deleted { ticket, .. }
            | Self::MaterialsReplaced { ticket, .. }
            | Self::MaterialDeleted { ticket, .. } => ticket.correlation_id,
        }
    }

    /// Whether this action ends an operation
    #[must_use]
    pub const fn is_resolution(&self) -> bool {
        matches!(
            self,
            Self::Fetched { .. }
                | Self::Created { .. }
                | Self::Updated { .. }
                | Self::Deleted { .. }
                | Self::MaterialsReplaced { .. }
                | Self::MaterialDeleted { .. }
        )
    }
}

/// Production suggestions actions
#[derive(Debug, Clone, PartialEq)]
pub enum ProductionAction {
    /// Load server-computed suggestions
    FetchSuggestions {
        /// Caller correlation ID
        correlation_id: CorrelationId,
    },
    /// Suggestions fetch finished
    SuggestionsFetched {
        /// Issued ticket
        ticket: RequestTicket,
        /// Server list or classified failure
        result: Result<Vec<ProductionSuggestion>, ErrorEnvelope>,
    },
}

impl ProductionAction {
    /// Correlation ID of the command or of the ticket
    #[must_use]
    pub const fn correlation_id(&self) -> CorrelationId {
        match self {
            Self::FetchSuggestions { correlation_id } => *correlation_id,
            Self::SuggestionsFetched { ticket, .. } => ticket.correlation_id,
        }
    }

    /// Whether this action ends an operation
    #[must_use]
    pub const fn is_resolution(&self) -> bool {
        matches!(self, Self::SuggestionsFetched { .. })
    }
}

/// Server identity and health actions
#[derive(Debug, Clone, PartialEq)]
pub enum SystemAction {
    /// Ask which server instance is answering
    FetchWhoami {
        /// Caller correlation ID
        correlation_id: CorrelationId,
    },
    /// Whoami finished
    WhoamiFetched {
        /// Issued ticket
        ticket: RequestTicket,
        /// Host name or classified failure
        result: Result<String, ErrorEnvelope>,
    },
    /// Check server health
    ///
    /// Not tracked: the check never touches `loading` or `error`.
    CheckHealth {
        /// Caller correlation ID
        correlation_id: CorrelationId,
    },
    /// Health check finished; an unreachable server counts as unhealthy
    HealthChecked {
        /// Caller correlation ID
        correlation_id: CorrelationId,
        /// Check outcome
        healthy: bool,
    },
}

impl SystemAction {
    /// Correlation ID of the command or of the resolution
    #[must_use]
    pub const fn correlation_id(&self) -> CorrelationId {
        match self {
            Self::FetchWhoami { correlation_id }
            | Self::CheckHealth { correlation_id }
            | Self::HealthChecked { correlation_id, .. } => *correlation_id,
            Self::WhoamiFetched { ticket, .. } => ticket.correlation_id,
        }
    }

    /// Whether this action ends an operation
    #[must_use]
    pub const fn is_resolution(&self) -> bool {
        matches!(self, Self::WhoamiFetched { .. } | Self::HealthChecked { .. })
    }
}

/// Root action
#[derive(Debug, Clone, PartialEq)]
pub enum InventoryAction {
    /// Raw materials collection
    RawMaterials(RawMaterialsAction),
    /// Products collection
    Products(ProductsAction),
    /// Production suggestions
    Production(ProductionAction),
    /// Server identity and health
    System(SystemAction),
    /// Fetch all three collections in parallel under one correlation ID
    Refresh {
        /// Caller correlation ID, shared by the three fetches
        correlation_id: CorrelationId,
    },
}

impl InventoryAction {
    /// Correlation ID carried by this action
    #[must_use]
    pub const fn correlation_id(&self) -> CorrelationId {
        match self {
            Self::RawMaterials(action) => action.correlation_id(),
            Self::Products(action) => action.correlation_id(),
            Self::Production(action) => action.correlation_id(),
            Self::System(action) => action.correlation_id(),
            Self::Refresh { correlation_id } => *correlation_id,
        }
    }

    /// Whether this action ends an operation
    #[must_use]
    pub const fn is_resolution(&self) -> bool {
        match self {
            Self::RawMaterials(action) => action.is_resolution(),
            Self::Products(action) => action.is_resolution(),
            Self::Production(action) => action.is_resolution(),
            Self::System(action) => action.is_resolution(),
            Self::Refresh { .. } => false,
        }
    }

    /// Whether this action resolves the command with `correlation_id`
    #[must_use]
    pub fn resolves(&self, correlation_id: CorrelationId) -> bool {
        self.is_resolution() && self.correlation_id() == correlation_id
    }
}

impl From<RawMaterialsAction> for InventoryAction {
    fn from(action: RawMaterialsAction) -> Self {
        Self::RawMaterials(action)
    }
}

impl From<ProductsAction> for InventoryAction {
    fn from(action: ProductsAction) -> Self {
        Self::Products(action)
    }
}

impl From<ProductionAction> for InventoryAction {
    fn from(action: ProductionAction) -> Self {
        Self::Production(action)
    }
}

impl From<SystemAction> for InventoryAction {
    fn from(action: SystemAction) -> Self {
        Self::System(action)
    }
}
