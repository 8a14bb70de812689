//! Place business logic - where transactions happened.

use crate::{
    entities::{Place, Transaction, place, transaction},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};

/// Adds a place. Coordinates, when given, must be valid decimal degrees.
pub async fn create_place(
    db: &DatabaseConnection,
    name: String,
    address: Option<String>,
    coordinates: Option<(f64, f64)>,
) -> Result<place::Model> {
    if name.trim().is_empty() {
        return Err(Error::invalid_input("Place name cannot be empty"));
    }
    if let Some((lat, lon)) = coordinates {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(Error::invalid_input(format!(
                "Invalid coordinates ({lat}, {lon})"
            )));
        }
    }

    let model = place::ActiveModel {
        name: Set(name.trim().to_string()),
        address: Set(address),
        latitude: Set(coordinates.map(|c| c.0)),
        longitude: Set(coordinates.map(|c| c.1)),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Finds a place by ID.
pub async fn get_place_by_id(db: &DatabaseConnection, place_id: i64) -> Result<Option<place::Model>> {
    Place::find_by_id(place_id).one(db).await.map_err(Into::into)
}

/// Lists places alphabetically.
pub async fn get_all_places(db: &DatabaseConnection) -> Result<Vec<place::Model>> {
    Place::find()
        .order_by_asc(place::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a place, detaching it from any transaction.
pub async fn delete_place(db: &DatabaseConnection, place_id: i64) -> Result<()> {
    Transaction::update_many()
        .col_expr(transaction::Column::PlaceId, Expr::value(Option::<i64>::None))
        .filter(transaction::Column::PlaceId.eq(place_id))
        .exec(db)
        .await?;

    let result = Place::delete_by_id(place_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "Place",
            id: place_id,
        });
    }
    Ok(())
}
