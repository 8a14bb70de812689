//! Person business logic - counterparts of debts and credits.

use crate::{
    entities::{Debt, Person, debt, person},
    errors::{DataErrorCode, Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Adds a person.
pub async fn create_person(
    db: &DatabaseConnection,
    name: String,
    note: Option<String>,
) -> Result<person::Model> {
    if name.trim().is_empty() {
        return Err(Error::invalid_input("Person name cannot be empty"));
    }
    let model = person::ActiveModel {
        name: Set(name.trim().to_string()),
        note: Set(note),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Finds a person by ID.
pub async fn get_person_by_id(
    db: &DatabaseConnection,
    person_id: i64,
) -> Result<Option<person::Model>> {
    Person::find_by_id(person_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists people alphabetically.
pub async fn get_all_people(db: &DatabaseConnection) -> Result<Vec<person::Model>> {
    Person::find()
        .order_by_asc(person::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a person no debt refers to.
pub async fn delete_person(db: &DatabaseConnection, person_id: i64) -> Result<()> {
    let debts = Debt::find()
        .filter(debt::Column::PersonId.eq(person_id))
        .count(db)
        .await?;
    if debts > 0 {
        return Err(Error::data(DataErrorCode::PersonUsedInDebt));
    }

    let result = Person::delete_by_id(person_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "Person",
            id: person_id,
        });
    }
    Ok(())
}
