#[derive(Debug, Clone)]
pub struct CatalogItem {
    pub number: u32,
    pub name: String,
    pub price: i64,
    pub variants: Vec<String>,
    pub promo: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CatalogCategory {
    pub key: String,
    pub title: String,
    pub items: Vec<CatalogItem>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    categories: Vec<CatalogCategory>,
}

struct ItemSpec {
    name: &'static str,
    price: i64,
    variants: &'static [&'static str],
    promo: Option<&'static str>,
}

const fn item(name: &'static str, price: i64, variants: &'static [&'static str]) -> ItemSpec {
    ItemSpec {
        name,
        price,
        variants,
        promo: None,
    }
}

const MENU: &[(&str, &str, &[ItemSpec])] = &[
    (
        "milktea",
        "🧋 Milk Tea & Coolers",
        &[
            item("Classic Milk Tea", 12000, &["Medium", "Large"]),
            item("Wintermelon Milk Tea", 13000, &["Medium", "Large"]),
            item("Taro Milk Tea", 13000, &["Medium", "Large"]),
            item("Brown Sugar Fresh Milk", 15000, &[]),
            item("Cucumber Lemonade", 9000, &[]),
            item("Sago't Gulaman", 7000, &[]),
        ],
    ),
    (
        "silog",
        "🍳 Silog Meals",
        &[
            item("Tapsilog", 18000, &[]),
            item("Tocilog", 15000, &[]),
            item("Longsilog", 14000, &[]),
            item("Bangsilog", 16000, &[]),
            ItemSpec {
                name: "Sisig Rice Bowl",
                price: 19000,
                variants: &["Pork", "Chicken"],
                promo: Some("Php 20 off until end of month"),
            },
        ],
    ),
    (
        "merienda",
        "🥟 Merienda",
        &[
            item("Pork Siomai (4 pcs)", 6000, &["Steamed", "Fried"]),
            item("Cheese Sticks (6 pcs)", 5000, &[]),
            item("Banana Cue (2 pcs)", 4000, &[]),
            item("Turon (2 pcs)", 4500, &[]),
        ],
    ),
    (
        "desserts",
        "🍨 Desserts",
        &[
            item("Halo-Halo Special", 12000, &[]),
            item("Leche Flan", 8000, &[]),
            item("Mais con Yelo", 9000, &[]),
        ],
    ),
    (
        "addons",
        "➕ Add-ons",
        &[
            item("Extra Rice", 2500, &[]),
            item("Pearls / Sago", 2000, &[]),
            item("Extra Sauce", 1500, &[]),
        ],
    ),
];

impl Catalog {
    pub fn standard() -> Self {
        let mut next_number = 1u32;
        let categories = MENU
            .iter()
            .map(|(key, title, specs)| CatalogCategory {
                key: (*key).to_string(),
                title: (*title).to_string(),
                items: specs
                    .iter()
                    .map(|spec| {
                        let number = next_number;
                        next_number += 1;
                        CatalogItem {
                            number,
                            name: spec.name.to_string(),
                            price: spec.price,
                            variants: spec.variants.iter().map(|v| (*v).to_string()).collect(),
                            promo: spec.promo.map(str::to_string),
                        }
                    })
                    .collect(),
            })
            .collect();

        Self { categories }
    }

    pub fn categories(&self) -> &[CatalogCategory] {
        &self.categories
    }

    pub fn category(&self, key: &str) -> Option<&CatalogCategory> {
        self.categories.iter().find(|category| category.key == key)
    }

    pub fn lookup(&self, number: u32) -> Option<&CatalogItem> {
        self.items().find(|item| item.number == number)
    }

    pub fn items(&self) -> impl Iterator<Item = &CatalogItem> {
        self.categories.iter().flat_map(|category| category.items.iter())
    }
}
