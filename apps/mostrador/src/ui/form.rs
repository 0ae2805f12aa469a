use thiserror::Error;

use crate::model::{Product, ProductDraft};

/// The editable fields of the product form, decoupled from rendering. Field
/// values stay raw text until submit; `to_draft` is the only place they are
/// validated and converted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Name is required")]
    NameRequired,
    #[error("Description is required")]
    DescriptionRequired,
    #[error("Price is required")]
    PriceRequired,
    #[error("Price must be a number")]
    PriceInvalid,
}

impl ProductForm {
    /// Seed every field from a listed product (begin-edit).
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.description.is_empty() && self.price.is_empty()
    }

    /// Required-field checks, then the submit payload. Returns the first
    /// problem so the caller can surface one message at a time.
    pub fn to_draft(&self) -> Result<ProductDraft, FormError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(FormError::NameRequired);
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(FormError::DescriptionRequired);
        }
        let price = self.price.trim();
        if price.is_empty() {
            return Err(FormError::PriceRequired);
        }
        let price = price.parse::<f64>().map_err(|_| FormError::PriceInvalid)?;
        Ok(ProductDraft {
            name: name.to_string(),
            description: description.to_string(),
            price,
        })
    }
}
