//! The launch catalog loaded by `lumiere seed`.

use lumiere_common::{Category, Money, Notes, ProductDraft, SizeStocks};

struct Fragrance {
    name: &'static str,
    category: Category,
    price_per_10ml: f64,
    reviews: u32,
    description: &'static str,
    top: &'static [&'static str],
    heart: &'static [&'static str],
    base: &'static [&'static str],
    /// Units on hand for 30ml, 50ml and 100ml.
    stock: [u32; 3],
}

const SIZES: [&str; 3] = ["30ml", "50ml", "100ml"];

/// The first four are featured on the home page.
const FEATURED_COUNT: usize = 4;

const CATALOG: &[Fragrance] = &[
    Fragrance {
        name: "Midnight Rose",
        category: Category::Floral,
        price_per_10ml: 18.5,
        reviews: 124,
        description: "An enchanting blend of Damascus rose and midnight jasmine that captures the essence of a moonlit garden.",
        top: &["Bergamot", "Pink Pepper", "Mandarin"],
        heart: &["Damascus Rose", "Jasmine Sambac", "Lily of the Valley"],
        base: &["Sandalwood", "White Musk", "Amber"],
        stock: [20, 45, 15],
    },
    Fragrance {
        name: "Ocean Breeze",
        category: Category::Fresh,
        price_per_10ml: 16.5,
        reviews: 89,
        description: "Fresh marine notes with hints of sea salt and citrus that transport you to pristine coastal waters.",
        top: &["Sea Salt", "Lemon", "Grapefruit"],
        heart: &["Marine Accord", "Water Lily", "Cucumber"],
        base: &["Driftwood", "White Amber", "Clean Musk"],
        stock: [30, 25, 12],
    },
    Fragrance {
        name: "Golden Amber",
        category: Category::Oriental,
        price_per_10ml: 19.5,
        reviews: 156,
        description: "Warm amber and vanilla with exotic spice undertones",
        top: &["Cardamom", "Pink Pepper"],
        heart: &["Amber", "Vanilla Orchid"],
        base: &["Sandalwood", "Musk"],
        stock: [18, 8, 20],
    },
    Fragrance {
        name: "Silk Garden",
        category: Category::Floral,
        price_per_10ml: 17.5,
        reviews: 203,
        description: "Delicate peony and silk tree blossom harmony",
        top: &["Green Apple", "Pear"],
        heart: &["Peony", "Rose"],
        base: &["Cedarwood", "Musk"],
        stock: [40, 35, 25],
    },
    Fragrance {
        name: "Urban Noir",
        category: Category::Oriental,
        price_per_10ml: 21.0,
        reviews: 95,
        description: "Bold blend of dark woods and smoky incense",
        top: &["Black Pepper", "Bergamot"],
        heart: &["Incense", "Leather"],
        base: &["Cedar", "Patchouli"],
        stock: [15, 22, 6],
    },
    Fragrance {
        name: "Citrus Dawn",
        category: Category::Fresh,
        price_per_10ml: 15.5,
        reviews: 78,
        description: "Energizing citrus burst with morning dew freshness",
        top: &["Lemon", "Mandarin"],
        heart: &["Orange Blossom", "Green Tea"],
        base: &["White Musk", "Cedarwood"],
        stock: [50, 40, 30],
    },
    Fragrance {
        name: "Velvet Orchid",
        category: Category::Floral,
        price_per_10ml: 22.5,
        reviews: 167,
        description: "Exotic orchid petals with velvety smooth finish",
        top: &["Rum", "Honey"],
        heart: &["Black Orchid", "Velvet Flower"],
        base: &["Vanilla", "Sandalwood"],
        stock: [12, 0, 9],
    },
    Fragrance {
        name: "Mystic Woods",
        category: Category::Oriental,
        price_per_10ml: 19.0,
        reviews: 134,
        description: "Mysterious forest blend with ancient cedar and moss",
        top: &["Pine", "Juniper"],
        heart: &["Cedarwood", "Moss"],
        base: &["Patchouli", "Amber"],
        stock: [25, 30, 14],
    },
];

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Drafts for the eight launch fragrances, each sold in 30, 50 and 100 ml.
pub fn default_catalog() -> Vec<ProductDraft> {
    CATALOG
        .iter()
        .enumerate()
        .map(|(index, f)| {
            let mut draft = ProductDraft::new(f.name, f.category, Money::from_dollars(f.price_per_10ml));
            draft.description = f.description.to_string();
            draft.reviews = f.reviews;
            draft.sizes = strings(&SIZES);
            draft.size_stocks = SIZES
                .iter()
                .zip(f.stock)
                .map(|(size, units)| (size.to_string(), units))
                .collect::<SizeStocks>();
            draft.notes = Notes {
                top: strings(f.top),
                heart: strings(f.heart),
                base: strings(f.base),
            };
            draft.is_featured = index < FEATURED_COUNT;
            draft
        })
        .collect()
}
