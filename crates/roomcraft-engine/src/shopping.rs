use reqwest::Url;
use roomcraft_contracts::design::FurnitureItem;

const SHOPPING_SEARCH_BASE: &str = "https://www.google.com/search";

/// Where "shop" should take the user: their own link when set, otherwise a
/// shopping search for the item's query.
pub fn shopping_url(item: &FurnitureItem) -> String {
    if let Some(link) = item
        .link
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return link.to_string();
    }
    let query = if item.search_query.trim().is_empty() {
        item.item_name.trim()
    } else {
        item.search_query.trim()
    };
    match Url::parse_with_params(SHOPPING_SEARCH_BASE, &[("q", query), ("tbm", "shop")]) {
        Ok(url) => url.to_string(),
        Err(_) => SHOPPING_SEARCH_BASE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use roomcraft_contracts::design::FurnitureItem;

    use super::shopping_url;

    #[test]
    fn search_url_encodes_query() {
        let item = FurnitureItem::new("Sofa", "Blue velvet", "blue velvet sofa & loveseat");
        assert_eq!(
            shopping_url(&item),
            "https://www.google.com/search?q=blue+velvet+sofa+%26+loveseat&tbm=shop"
        );
    }

    #[test]
    fn user_link_wins() {
        let item = FurnitureItem::custom("West Elm Sofa", Some("https://westelm.test/sofa".into()));
        assert_eq!(shopping_url(&item), "https://westelm.test/sofa");
    }
}
