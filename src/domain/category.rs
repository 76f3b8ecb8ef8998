//! Category entity.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::ImageRef;

pub const NAME_MAX: usize = 50;
pub const DESCRIPTION_MAX: usize = 500;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub image: Option<ImageRef>,
    pub is_active: bool,
    pub featured: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for inserting a category, after form parsing and the
/// case-insensitive uniqueness check have both passed.
#[derive(Clone, Debug)]
pub struct NewCategory {
    pub name: String,
    pub description: String,
    pub image: Option<ImageRef>,
    pub is_active: bool,
    pub featured: bool,
    pub display_order: i32,
}

/// Partial update; `None` leaves the field untouched. The image field is
/// doubly optional so callers can distinguish "keep", "remove", and
/// "replace".
#[derive(Clone, Debug, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub featured: Option<bool>,
    pub display_order: Option<i32>,
    pub image: Option<Option<ImageRef>>,
}

impl Category {
    pub fn new(new: NewCategory) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            image: new.image,
            is_active: new.is_active,
            featured: new.featured,
            display_order: new.display_order,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: CategoryUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(featured) = update.featured {
            self.featured = featured;
        }
        if let Some(display_order) = update.display_order {
            self.display_order = display_order;
        }
        if let Some(image) = update.image {
            self.image = image;
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewCategory {
        NewCategory {
            name: "Shoes".into(),
            description: String::new(),
            image: None,
            is_active: true,
            featured: false,
            display_order: 0,
        }
    }

    #[test]
    fn apply_leaves_untouched_fields() {
        let mut cat = Category::new(sample());
        cat.apply(CategoryUpdate {
            featured: Some(true),
            ..Default::default()
        });
        assert!(cat.featured);
        assert_eq!(cat.name, "Shoes");
        assert!(cat.is_active);
    }

    #[test]
    fn apply_can_remove_image() {
        let mut cat = Category::new(NewCategory {
            image: Some(ImageRef {
                url: "http://cdn/x.jpg".into(),
                alt: "Shoes".into(),
                public_id: "categories/x.jpg".into(),
            }),
            ..sample()
        });
        cat.apply(CategoryUpdate {
            image: Some(None),
            ..Default::default()
        });
        assert!(cat.image.is_none());
    }
}
