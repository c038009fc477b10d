use crate::models::Recipe;

/// Minimum number of views, exclusive
pub const POPULAR_MIN_VIEWS: u64 = 50;
/// Minimum average rating, exclusive
pub const POPULAR_MIN_RATING: f64 = 4.0;
/// Minimum saves-per-view ratio, exclusive
pub const POPULAR_MIN_ENGAGEMENT: f64 = 0.05;
/// Prefix put in front of popular recipe titles
pub const POPULAR_MARKER: &str = "🔥 ";

/// Saves per view; 0.0 when the recipe has never been viewed
///
/// Not clamped: more saves than views is a valid (if odd) state.
pub fn engagement_rate(recipe: &Recipe) -> f64 {
    if recipe.views == 0 {
        return 0.0;
    }
    recipe.saves as f64 / recipe.views as f64
}

/// A recipe is popular when views, rating and engagement all strictly exceed their thresholds
pub fn is_popular(recipe: Option<&Recipe>) -> bool {
    let Some(recipe) = recipe else {
        return false;
    };

    recipe.views > POPULAR_MIN_VIEWS
        && recipe.average_rating > POPULAR_MIN_RATING
        && engagement_rate(recipe) > POPULAR_MIN_ENGAGEMENT
}

/// Title as shown to users, marked when the recipe is popular
pub fn display_title(recipe: &Recipe) -> String {
    if is_popular(Some(recipe)) {
        format!("{}{}", POPULAR_MARKER, recipe.title)
    } else {
        recipe.title.clone()
    }
}

/// Inverse of [`display_title`]
pub fn strip_popular_marker(display: &str) -> &str {
    display.strip_prefix(POPULAR_MARKER).unwrap_or(display)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(views: u64, saves: u64, rating: f64) -> Recipe {
        let mut recipe = Recipe::new("1", "Pasta");
        recipe.views = views;
        recipe.saves = saves;
        recipe.average_rating = rating;
        recipe
    }

    #[test]
    fn test_popular_recipe() {
        assert!(is_popular(Some(&recipe(100, 10, 4.5))));
    }

    #[test]
    fn test_rating_drop_makes_recipe_unpopular() {
        assert!(!is_popular(Some(&recipe(100, 10, 3.5))));
    }

    #[test]
    fn test_absent_recipe_is_not_popular() {
        assert!(!is_popular(None));
    }

    #[test]
    fn test_threshold_boundaries_are_exclusive() {
        // views at threshold
        assert!(!is_popular(Some(&recipe(50, 10, 4.5))));
        assert!(is_popular(Some(&recipe(51, 10, 4.5))));
        // rating at threshold
        assert!(!is_popular(Some(&recipe(100, 10, 4.0))));
        // engagement exactly 5%
        assert!(!is_popular(Some(&recipe(100, 5, 4.5))));
        assert!(is_popular(Some(&recipe(100, 6, 4.5))));
    }

    #[test]
    fn test_each_threshold_alone_is_insufficient() {
        let views = [10, 50, 51, 1000];
        let saves = [0, 1, 5, 6, 60];
        let ratings = [0.0, 3.9, 4.0, 4.01, 5.0];

        for &v in &views {
            for &s in &saves {
                for &r in &ratings {
                    let candidate = recipe(v, s, r);
                    let expected =
                        v > 50 && r > 4.0 && v > 0 && (s as f64 / v as f64) > 0.05;
                    assert_eq!(
                        is_popular(Some(&candidate)),
                        expected,
                        "views={} saves={} rating={}",
                        v,
                        s,
                        r
                    );
                }
            }
        }
    }

    #[test]
    fn test_zero_views_has_zero_engagement() {
        assert_eq!(engagement_rate(&recipe(0, 0, 5.0)), 0.0);
        assert_eq!(engagement_rate(&recipe(0, 40, 5.0)), 0.0);
        assert!(!is_popular(Some(&recipe(0, 40, 5.0))));
    }

    #[test]
    fn test_engagement_above_one_is_not_clamped() {
        assert_eq!(engagement_rate(&recipe(10, 25, 0.0)), 2.5);
    }

    #[test]
    fn test_display_title_marks_popular() {
        assert_eq!(display_title(&recipe(100, 10, 4.5)), "🔥 Pasta");
        assert_eq!(display_title(&recipe(100, 10, 3.5)), "Pasta");
    }

    #[test]
    fn test_display_title_round_trip() {
        for r in [recipe(100, 10, 4.5), recipe(0, 0, 0.0), recipe(51, 3, 4.9)] {
            assert_eq!(strip_popular_marker(&display_title(&r)), r.title);
        }
    }
}
