//! Bin layout and category → bin assignment.
//!
//! Bins are scanned in layer/section/bin order. A category keeps the bin it
//! was first bound to; unbound bins are claimed lowest address first; MISC
//! is the overflow category when no dedicated bin is left.

use sorter_common::consts::MISC_CATEGORY;
use sorter_common::pipeline::config::LayoutConfig;
use sorter_common::pipeline::events::{EventSender, SorterEvent};
use sorter_common::pipeline::piece::{BinAddress, BinSize};
use sorter_common::store::{BindingStore, CategoryMatrix};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("saved bindings do not match the configured layout shape")]
    ShapeMismatch,

    #[error("category '{category}' is bound to both {first} and {second}")]
    DuplicateCategory {
        category: String,
        first: BinAddress,
        second: BinAddress,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bin {
    pub size: BinSize,
    pub category_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub bins: Vec<Bin>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub sections: Vec<Section>,
}

/// Outcome of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub address: BinAddress,
    /// Category actually routed to; MISC when the fallback was used.
    pub category_id: String,
    /// The bin was free and has just been bound.
    pub newly_bound: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinLayout {
    layers: Vec<Layer>,
}

impl BinLayout {
    /// Unbound layout with the configured shape.
    pub fn from_config(config: &LayoutConfig) -> Self {
        let layers = config
            .layers
            .iter()
            .map(|layer| Layer {
                sections: layer
                    .sections
                    .iter()
                    .map(|sizes| Section {
                        bins: sizes
                            .iter()
                            .map(|&size| Bin {
                                size,
                                category_id: None,
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();
        Self { layers }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn bin(&self, address: BinAddress) -> Option<&Bin> {
        self.layers
            .get(address.layer)?
            .sections
            .get(address.section)?
            .bins
            .get(address.bin)
    }

    /// Number of bins in a section.
    pub fn section_len(&self, layer: usize, section: usize) -> Option<usize> {
        Some(self.layers.get(layer)?.sections.get(section)?.bins.len())
    }

    fn addresses(&self) -> impl Iterator<Item = (BinAddress, &Bin)> {
        self.layers.iter().enumerate().flat_map(|(l, layer)| {
            layer.sections.iter().enumerate().flat_map(move |(s, section)| {
                section
                    .bins
                    .iter()
                    .enumerate()
                    .map(move |(b, bin)| (BinAddress::new(l, s, b), bin))
            })
        })
    }

    /// Bin currently bound to `category`.
    pub fn find_bin(&self, category: &str) -> Option<BinAddress> {
        self.addresses()
            .find(|(_, bin)| bin.category_id.as_deref() == Some(category))
            .map(|(address, _)| address)
    }

    /// First bin with no category.
    pub fn first_free(&self) -> Option<BinAddress> {
        self.addresses()
            .find(|(_, bin)| bin.category_id.is_none())
            .map(|(address, _)| address)
    }

    pub fn bound_count(&self) -> usize {
        self.addresses()
            .filter(|(_, bin)| bin.category_id.is_some())
            .count()
    }

    fn bin_mut(&mut self, address: BinAddress) -> Option<&mut Bin> {
        self.layers
            .get_mut(address.layer)?
            .sections
            .get_mut(address.section)?
            .bins
            .get_mut(address.bin)
    }

    fn find_or_bind(&mut self, category: &str) -> Option<Assignment> {
        if let Some(address) = self.find_bin(category) {
            return Some(Assignment {
                address,
                category_id: category.to_string(),
                newly_bound: false,
            });
        }
        let address = self.first_free()?;
        self.bin_mut(address)?.category_id = Some(category.to_string());
        Some(Assignment {
            address,
            category_id: category.to_string(),
            newly_bound: true,
        })
    }

    /// Find the bin for `category`, binding a free one if needed, and fall
    /// back to MISC when no bin can be secured. No persistence.
    pub fn find_or_assign(&mut self, category: &str) -> Option<Assignment> {
        if let Some(assignment) = self.find_or_bind(category) {
            return Some(assignment);
        }
        if category == MISC_CATEGORY {
            return None;
        }
        self.find_or_bind(MISC_CATEGORY)
    }

    /// [`find_or_assign`](Self::find_or_assign), then persist and announce a
    /// new binding. A store failure is logged; the in-memory binding stands.
    pub fn assign(
        &mut self,
        category: &str,
        store: &dyn BindingStore,
        events: &EventSender,
    ) -> Option<Assignment> {
        let assignment = self.find_or_assign(category)?;
        if assignment.category_id != category {
            warn!(
                "No bin left for category '{}', routing to '{}'",
                category, assignment.category_id
            );
        }
        if assignment.newly_bound {
            info!(
                "Bound category '{}' to bin {}",
                assignment.category_id, assignment.address
            );
            if let Err(e) = store.save_bindings(&self.to_matrix()) {
                warn!("Failed to persist bin bindings: {}", e);
            }
            events.emit(SorterEvent::BinAssigned {
                address: assignment.address,
                category_id: assignment.category_id.clone(),
            });
        }
        Some(assignment)
    }

    /// Current bindings as a `[layer][section][bin]` matrix.
    pub fn to_matrix(&self) -> CategoryMatrix {
        self.layers
            .iter()
            .map(|layer| {
                layer
                    .sections
                    .iter()
                    .map(|section| {
                        section
                            .bins
                            .iter()
                            .map(|bin| bin.category_id.clone())
                            .collect()
                    })
                    .collect()
            })
            .collect()
    }

    pub fn matches_shape(&self, matrix: &CategoryMatrix) -> bool {
        self.layers.len() == matrix.len()
            && self.layers.iter().zip(matrix).all(|(layer, m_layer)| {
                layer.sections.len() == m_layer.len()
                    && layer
                        .sections
                        .iter()
                        .zip(m_layer)
                        .all(|(section, m_section)| section.bins.len() == m_section.len())
            })
    }

    /// Replace all bindings with `matrix`.
    ///
    /// # Errors
    /// The layout is left untouched if the shape differs or a category
    /// appears in more than one bin.
    pub fn apply_bindings(&mut self, matrix: &CategoryMatrix) -> Result<(), LayoutError> {
        if !self.matches_shape(matrix) {
            return Err(LayoutError::ShapeMismatch);
        }
        let mut seen: HashMap<&str, BinAddress> = HashMap::new();
        for (l, layer) in matrix.iter().enumerate() {
            for (s, section) in layer.iter().enumerate() {
                for (b, category) in section.iter().enumerate() {
                    let Some(category) = category.as_deref() else {
                        continue;
                    };
                    let address = BinAddress::new(l, s, b);
                    if let Some(first) = seen.insert(category, address) {
                        return Err(LayoutError::DuplicateCategory {
                            category: category.to_string(),
                            first,
                            second: address,
                        });
                    }
                }
            }
        }
        for (layer, m_layer) in self.layers.iter_mut().zip(matrix) {
            for (section, m_section) in layer.sections.iter_mut().zip(m_layer) {
                for (bin, category) in section.bins.iter_mut().zip(m_section) {
                    bin.category_id = category.clone();
                }
            }
        }
        Ok(())
    }

    /// Apply saved bindings from `store` if they fit this layout.
    ///
    /// Returns `true` when bindings were applied. Anything unusable is
    /// logged and ignored.
    pub fn restore(&mut self, store: &dyn BindingStore) -> bool {
        let matrix = match store.load_bindings() {
            Ok(Some(matrix)) => matrix,
            Ok(None) => return false,
            Err(e) => {
                warn!("Failed to load saved bin bindings: {}", e);
                return false;
            }
        };
        match self.apply_bindings(&matrix) {
            Ok(()) => {
                info!("Restored {} bin bindings", self.bound_count());
                true
            }
            Err(e) => {
                warn!("Ignoring saved bin bindings: {}", e);
                false
            }
        }
    }
}
