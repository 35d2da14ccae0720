use std::sync::Arc;

use critica_api_types::{CategoryItem, CategoryListResponse, CreateCategoryRequest};

use crate::application::error::AppError;
use crate::application::repos::{CategoriesRepo, CreateCategoryParams};
use crate::cache::CacheTrigger;
use crate::domain::entities::CategoryRecord;
use crate::domain::slug::generate_unique_slug;

#[derive(Clone)]
pub struct CategoryService {
    categories: Arc<dyn CategoriesRepo>,
    cache: CacheTrigger,
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoriesRepo>, cache: CacheTrigger) -> Self {
        Self { categories, cache }
    }

    pub async fn list(&self) -> Result<CategoryListResponse, AppError> {
        let records = self.categories.list_categories().await?;
        Ok(CategoryListResponse {
            items: records.iter().map(category_item).collect(),
        })
    }

    pub async fn create(&self, request: CreateCategoryRequest) -> Result<CategoryItem, AppError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("category name must not be empty"));
        }

        let existing: Vec<String> = self
            .categories
            .list_categories()
            .await?
            .into_iter()
            .map(|category| category.slug)
            .collect();
        let slug = generate_unique_slug(&name, |candidate| {
            !existing.iter().any(|taken| taken == candidate)
        })?;

        let record = self
            .categories
            .create_category(CreateCategoryParams {
                slug,
                name,
                description: request
                    .description
                    .map(|text| text.trim().to_string())
                    .filter(|text| !text.is_empty()),
            })
            .await?;

        self.cache.category_changed().await;

        Ok(category_item(&record))
    }
}

fn category_item(record: &CategoryRecord) -> CategoryItem {
    CategoryItem {
        id: record.id,
        slug: record.slug.clone(),
        name: record.name.clone(),
        description: record.description.clone(),
    }
}
