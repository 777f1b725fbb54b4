use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub key: String,
    pub name: String,
}

impl CatalogItem {
    pub fn new(key: &str, name: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
        }
    }
}

/// Справочник услуг: категории (тип кузова) и виды услуги (тип мойки).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub categories: Vec<CatalogItem>,
    pub services: Vec<CatalogItem>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            categories: vec![
                CatalogItem::new("sedan", "Седан"),
                CatalogItem::new("suv", "Внедорожник (SUV)"),
                CatalogItem::new("hatchback", "Хэтчбек"),
                CatalogItem::new("van", "Минивэн"),
                CatalogItem::new("truck", "Грузовик"),
            ],
            services: vec![
                CatalogItem::new("single", "Однофазная мойка"),
                CatalogItem::new("double", "Двухфазная мойка"),
            ],
        }
    }
}

impl Catalog {
    pub fn category(&self, key: &str) -> Option<&CatalogItem> {
        self.categories.iter().find(|item| item.key == key)
    }

    pub fn service(&self, key: &str) -> Option<&CatalogItem> {
        self.services.iter().find(|item| item.key == key)
    }
}

/// Текстовое описание услуги, которое сохраняется в брони.
pub fn describe_service(category: &CatalogItem, service: &CatalogItem) -> String {
    format!("{} - {}", category.name, service.name)
}
