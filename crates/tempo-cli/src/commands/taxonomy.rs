//! Taxonomy management commands: categories, subcategories, tags.

use anyhow::{Context, Result};
use tempo_core::{CategoryId, SubcategoryId, TagId};
use tempo_db::Database;

use crate::cli::{CategoryAction, SubcategoryAction, TagAction};

pub fn category(db: &Database, action: &CategoryAction) -> Result<()> {
    match action {
        CategoryAction::Add { name } => {
            let id = db.add_category(name).context("failed to add category")?;
            println!("Added category {id}: {name}");
        }
        CategoryAction::List => {
            let categories = db.list_categories().context("failed to list categories")?;
            if categories.is_empty() {
                println!("No categories. Add one with 'tempo category add <name>'.");
            }
            for category in categories {
                println!("{:>4}  {}", category.id, category.name);
            }
        }
        CategoryAction::Rm { id } => {
            db.delete_category(CategoryId::new(*id))
                .context("failed to delete category")?;
            println!("Deleted category {id} and its subcategories.");
        }
    }
    Ok(())
}

pub fn subcategory(db: &Database, action: &SubcategoryAction) -> Result<()> {
    match action {
        SubcategoryAction::Add { name, category } => {
            let id = db
                .add_subcategory(name, CategoryId::new(*category))
                .context("failed to add subcategory")?;
            println!("Added subcategory {id}: {name}");
        }
        SubcategoryAction::List { category } => {
            let subcategories = db
                .subcategories_for_category(CategoryId::new(*category))
                .context("failed to list subcategories")?;
            if subcategories.is_empty() {
                println!("No subcategories for category {category}.");
            }
            for sub in subcategories {
                println!("{:>4}  {}", sub.id, sub.name);
            }
        }
        SubcategoryAction::Rm { id } => {
            db.delete_subcategory(SubcategoryId::new(*id))
                .context("failed to delete subcategory")?;
            println!("Deleted subcategory {id}.");
        }
    }
    Ok(())
}

pub fn tag(db: &Database, action: &TagAction) -> Result<()> {
    match action {
        TagAction::Add { name } => {
            let id = db.add_tag(name).context("failed to add tag")?;
            println!("Added tag {id}: {name}");
        }
        TagAction::List => {
            let tags = db.list_tags().context("failed to list tags")?;
            if tags.is_empty() {
                println!("No tags. Add one with 'tempo tag add <name>'.");
            }
            for tag in tags {
                println!("{:>4}  {}", tag.id, tag.name);
            }
        }
        TagAction::Rm { id } => {
            db.delete_tag(TagId::new(*id)).context("failed to delete tag")?;
            println!("Deleted tag {id}.");
        }
    }
    Ok(())
}
