use crate::{
    db::DocumentStore,
    error::{AppError, AppResult},
    models::average_rating,
};

/// Records a 1–5 rating and refreshes the recipe's stored average
///
/// The average is recomputed from every rating the recipe holds and written
/// back explicitly; nothing else updates it.
pub async fn rate_recipe(
    store: &dyn DocumentStore,
    recipe_id: &str,
    username: &str,
    rating: u8,
) -> AppResult<f64> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::InvalidInput(format!(
            "Rating must be between 1 and 5, got {}",
            rating
        )));
    }

    if store.find_user(username).await?.is_none() {
        return Err(AppError::NotFound(format!("User {} does not exist", username)));
    }

    let ratings = store.record_rating(recipe_id, username, rating).await?;
    let average = average_rating(&ratings);
    store.set_average_rating(recipe_id, average).await?;

    tracing::info!(
        recipe_id = %recipe_id,
        ratings = ratings.len(),
        average = average,
        "Average rating recomputed"
    );

    Ok(average)
}
