//! Demo catalog for the two seeded tenants.

use std::collections::BTreeMap;

use stockroom_catalog::{NewProduct, NewVariant};

fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn variant(sku: &str, pairs: &[(&str, &str)], stock: i64, price: u64, threshold: i64) -> NewVariant {
    NewVariant {
        sku: sku.to_string(),
        attributes: attrs(pairs),
        price,
        initial_stock: stock,
        low_stock_threshold: Some(threshold),
    }
}

fn product(name: &str, category: &str, description: &str, base_price: u64, variants: Vec<NewVariant>) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        category: category.to_string(),
        description: Some(description.to_string()),
        base_price,
        variants,
    }
}

pub fn electronics() -> Vec<NewProduct> {
    vec![
        product(
            "iPhone 14 Pro",
            "Smartphones",
            "Pro camera system with Dynamic Island",
            99_900,
            vec![
                variant("IPH14P-128-BLK", &[("storage", "128GB"), ("color", "Black")], 45, 99_900, 20),
                variant("IPH14P-256-BLK", &[("storage", "256GB"), ("color", "Black")], 5, 109_900, 20),
                variant("IPH14P-128-WHT", &[("storage", "128GB"), ("color", "White")], 89, 99_900, 20),
                variant("IPH14P-256-WHT", &[("storage", "256GB"), ("color", "White")], 95, 109_900, 20),
            ],
        ),
        product(
            "MacBook Air M2",
            "Laptops",
            "13.6-inch Liquid Retina display",
            119_900,
            vec![
                variant("MBA-M2-8-256-SLV", &[("ram", "8GB"), ("storage", "256GB"), ("color", "Silver")], 12, 119_900, 15),
                variant("MBA-M2-16-512-SLV", &[("ram", "16GB"), ("storage", "512GB"), ("color", "Silver")], 28, 149_900, 15),
                variant("MBA-M2-8-256-GRY", &[("ram", "8GB"), ("storage", "256GB"), ("color", "Space Gray")], 27, 119_900, 15),
            ],
        ),
        product(
            "AirPods Pro (2nd Gen)",
            "Audio",
            "Active noise cancellation",
            24_900,
            vec![variant("APP-2GEN-WHT", &[("color", "White")], 156, 24_900, 30)],
        ),
    ]
}

pub fn apparel() -> Vec<NewProduct> {
    let mut shirts = Vec::new();
    for (color, code) in [("Black", "BLK"), ("White", "WHT"), ("Blue", "BLU")] {
        for (size, stock) in [("S", 45), ("M", 25), ("L", 8)] {
            shirts.push(variant(
                &format!("TSH-{size}-{code}"),
                &[("size", size), ("color", color)],
                stock,
                2_900,
                20,
            ));
        }
    }

    let mut jeans = Vec::new();
    for (color, code) in [("Blue", "BLU"), ("Black", "BLK")] {
        for (size, stock) in [("28", 3), ("30", 34), ("32", 19)] {
            jeans.push(variant(
                &format!("JEAN-{size}-{code}"),
                &[("size", size), ("color", color)],
                stock,
                7_900,
                10,
            ));
        }
    }

    vec![
        product("Premium Cotton T-Shirt", "Apparel", "100% organic cotton", 2_900, shirts),
        product("Denim Jeans", "Apparel", "Slim fit stretch denim", 7_900, jeans),
    ]
}
