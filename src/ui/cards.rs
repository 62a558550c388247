//! Plain-text cards for the content snapshot.
//!
//! Rendering is a pure function of [`ContentState`]: the chat loop calls it
//! after every turn and prints the result when the revision changed.

use std::fmt::Write as _;

use crate::core::model::{Episode, Product};
use crate::ui::display::{ContentKind, ContentState};
use crate::utils::text::{strip_html_tags, truncate_with_ellipsis};

pub const MAX_PRODUCT_DESCRIPTION_CHARS: usize = 200;
pub const MAX_EPISODE_SUMMARY_CHARS: usize = 250;

pub const NO_PRODUCTS_MESSAGE: &str =
    "No products to display. Try asking \"What Wild Kratts toys are available?\"";
pub const NO_EPISODES_MESSAGE: &str = "No episodes match your criteria. Try a different search, \
like specifying a season, title, or featured animals.";

pub fn render_content(content: &ContentState) -> String {
    match content.active {
        ContentKind::Products if content.products.is_empty() => format!("{NO_PRODUCTS_MESSAGE}\n"),
        ContentKind::Products => content
            .products
            .iter()
            .map(|product| {
                render_product(product, content.expanded_products.contains(&product.id))
            })
            .collect::<Vec<_>>()
            .join("\n"),
        ContentKind::Episodes if content.episodes.is_empty() => format!("{NO_EPISODES_MESSAGE}\n"),
        ContentKind::Episodes => content
            .episodes
            .iter()
            .map(|episode| {
                let expanded = content.expanded_episodes.contains(&episode.display_key());
                render_episode(episode, expanded)
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn render_product(product: &Product, expanded: bool) -> String {
    let mut card = String::new();
    let _ = writeln!(card, "## {} [#{}]", strip_html_tags(&product.title.rendered), product.id);

    let description = product
        .description
        .as_deref()
        .map(strip_html_tags)
        .unwrap_or_default();
    let description = description.trim();
    if !description.is_empty() {
        let _ = writeln!(
            card,
            "{}",
            clipped(description, MAX_PRODUCT_DESCRIPTION_CHARS, expanded)
        );
    }

    if !product.categories().is_empty() {
        let _ = writeln!(card, "Categories: {}", product.categories().join(", "));
    }

    if product.retailers().is_empty() {
        let _ = writeln!(card, "View Product Details: {}", product.link);
    } else {
        for retailer in product.retailers() {
            let _ = writeln!(
                card,
                "Buy at {}: {}",
                retailer.retailer_name, retailer.product_url
            );
        }
    }
    card
}

pub fn render_episode(episode: &Episode, expanded: bool) -> String {
    fn or_unknown<T: ToString>(value: Option<T>) -> String {
        value.map_or_else(|| "?".to_string(), |value| value.to_string())
    }

    let mut card = String::new();
    let _ = writeln!(
        card,
        "## {}",
        episode.title.as_deref().unwrap_or("Untitled episode")
    );
    if episode.season.is_some() || episode.broadcast_number.is_some() || episode.air_date.is_some()
    {
        let _ = write!(
            card,
            "Season {}, Episode {}",
            or_unknown(episode.season),
            or_unknown(episode.broadcast_number)
        );
        if let Some(air_date) = episode.air_date.as_deref() {
            let _ = write!(card, " | Air Date: {air_date}");
        }
        card.push('\n');
    }

    if let Some(summary) = episode.summary.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(card, "{}", clipped(summary, MAX_EPISODE_SUMMARY_CHARS, expanded));
    }

    list_line(&mut card, "Animals Featured", episode.animals_featured.as_deref());
    if let Some(powers) = episode.creature_powers.as_deref().filter(|p| !p.is_empty()) {
        let powers: Vec<String> = powers
            .iter()
            .map(|power| format!("{} (Used by: {})", power.power, power.used_by))
            .collect();
        let _ = writeln!(card, "Creature Powers: {}", powers.join("; "));
    }
    list_line(&mut card, "Locations", episode.locations.as_deref());

    for (service, url) in episode.streaming_links() {
        let _ = writeln!(card, "Watch on {service}: {url}");
    }
    card
}

fn clipped(text: &str, limit: usize, expanded: bool) -> String {
    if expanded {
        return text.to_string();
    }
    match truncate_with_ellipsis(text, limit) {
        (short, true) => format!("{short} [more]"),
        (full, false) => full,
    }
}

fn list_line(card: &mut String, label: &str, items: Option<&[String]>) {
    if let Some(items) = items.filter(|items| !items.is_empty()) {
        let _ = writeln!(card, "{label}: {}", items.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{CreaturePower, RenderedText, Retailer};
    use crate::ui::display::DisplaySurface;

    fn long_product() -> Product {
        Product {
            id: 7,
            link: "https://example.test/p/7".to_string(),
            title: RenderedText {
                rendered: "Creature Power Suit".to_string(),
            },
            description: Some(format!("<p>{}</p>", "a".repeat(300))),
            product_categories: Some(vec!["Wear".to_string(), "Play".to_string()]),
            ..Product::default()
        }
    }

    #[test]
    fn long_descriptions_truncate_until_expanded() {
        let collapsed = render_product(&long_product(), false);
        assert!(collapsed.contains(&format!("{}... [more]", "a".repeat(200))));
        assert!(!collapsed.contains(&"a".repeat(201)));
        assert!(collapsed.contains("Categories: Wear, Play"));
        assert!(collapsed.contains("View Product Details: https://example.test/p/7"));

        let expanded = render_product(&long_product(), true);
        assert!(expanded.contains(&"a".repeat(300)));
        assert!(!expanded.contains("[more]"));
    }

    #[test]
    fn retailers_replace_canonical_link() {
        let product = Product {
            retailers: Some(vec![Retailer {
                retailer_name: "PBS Shop".to_string(),
                product_url: "https://shop.test/7".to_string(),
            }]),
            ..long_product()
        };
        let card = render_product(&product, false);
        assert!(card.contains("Buy at PBS Shop: https://shop.test/7"));
        assert!(!card.contains("View Product Details"));
    }

    #[test]
    fn partial_episodes_render_only_present_fields() {
        let episode = Episode {
            title: Some("Mom of a Croc".to_string()),
            ..Episode::default()
        };
        assert_eq!(render_episode(&episode, false), "## Mom of a Croc\n");
    }

    #[test]
    fn full_episode_card_lists_details() {
        let episode = Episode {
            season: Some(1),
            broadcast_number: Some(3),
            title: Some("Honey Seekers".to_string()),
            air_date: Some("2011-01-05".to_string()),
            summary: Some("b".repeat(260)),
            animals_featured: Some(vec!["Honey Badger".to_string()]),
            creature_powers: Some(vec![CreaturePower {
                power: "Badger claws".to_string(),
                used_by: "Chris".to_string(),
            }]),
            streaming_urls: Some(
                [("Netflix".to_string(), None), ("PBS KIDS".to_string(), Some("https://pbs.test".to_string()))]
                    .into_iter()
                    .collect(),
            ),
            ..Episode::default()
        };

        let card = render_episode(&episode, false);
        assert!(card.contains("Season 1, Episode 3 | Air Date: 2011-01-05"));
        assert!(card.contains(&format!("{}... [more]", "b".repeat(250))));
        assert!(card.contains("Creature Powers: Badger claws (Used by: Chris)"));
        assert!(card.contains("Watch on PBS KIDS: https://pbs.test"));
        assert!(!card.contains("Netflix"));
    }

    #[test]
    fn empty_lists_show_kind_specific_message() {
        let mut surface = DisplaySurface::new();
        assert_eq!(render_content(surface.content()), format!("{NO_PRODUCTS_MESSAGE}\n"));
        surface.display_episodes(Vec::new());
        assert_eq!(render_content(surface.content()), format!("{NO_EPISODES_MESSAGE}\n"));
    }
}
