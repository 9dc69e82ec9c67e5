//! Sample data for a fresh database.

use chrono::{Duration, NaiveDate};
use sha2::{Digest, Sha256};

use crate::catalog::{Category, Product, ProductStatus};

/// Rows inserted per transaction when generating
pub const SEED_BATCH_SIZE: usize = 100;

fn date(s: &str) -> NaiveDate {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
}

#[allow(clippy::too_many_arguments)]
fn sample(
  id: u64,
  name: &str,
  category: Category,
  price: u64,
  stock: u64,
  status: ProductStatus,
  created_at: &str,
  updated_at: &str,
) -> Product {
  Product {
    id,
    name: name.to_string(),
    category,
    price,
    stock,
    status,
    created_at: date(created_at),
    updated_at: date(updated_at),
  }
}

/// The twenty products a new server starts with
pub fn sample_products() -> Vec<Product> {
  use Category::*;
  use ProductStatus::*;

  vec![
    sample(1, "MacBook Pro 14-inch", Electronics, 298_000, 15, Active, "2024-01-15", "2024-03-01"),
    sample(2, "iPhone 15 Pro", Electronics, 179_800, 42, Active, "2024-02-10", "2024-03-05"),
    sample(3, "Cashmere sweater", Clothing, 35_000, 8, Active, "2024-01-20", "2024-02-28"),
    sample(4, "Organic coffee beans 1kg", Food, 3_500, 0, Soldout, "2024-02-01", "2024-03-10"),
    sample(5, "Denim jacket", Clothing, 18_000, 23, Active, "2024-01-25", "2024-02-15"),
    sample(6, "Nordic dining table", Furniture, 89_000, 5, Active, "2024-02-05", "2024-03-08"),
    sample(7, "Wireless earbuds", Electronics, 28_000, 67, Active, "2024-01-30", "2024-03-02"),
    sample(8, "Introduction to programming", Books, 3_200, 120, Active, "2024-02-15", "2024-02-20"),
    sample(9, "Leather business bag", Clothing, 45_000, 12, Active, "2024-01-18", "2024-02-25"),
    sample(10, "Ergonomic office chair", Furniture, 68_000, 0, Soldout, "2024-02-08", "2024-03-12"),
    sample(11, "Smartwatch", Electronics, 52_000, 35, Active, "2024-02-20", "2024-03-06"),
    sample(12, "Matcha set", Food, 8_500, 18, Active, "2024-01-22", "2024-02-18"),
    sample(13, "Vintage wine", Food, 25_000, 6, Inactive, "2024-02-12", "2024-03-01"),
    sample(14, "Design thinking handbook", Books, 2_800, 45, Active, "2024-01-28", "2024-02-22"),
    sample(15, "Modern three-seat sofa", Furniture, 158_000, 3, Active, "2024-02-18", "2024-03-09"),
    sample(16, "27-inch 4K monitor", Electronics, 65_000, 28, Active, "2024-02-25", "2024-03-11"),
    sample(17, "Organic black tea set", Food, 4_200, 55, Active, "2024-01-12", "2024-02-10"),
    sample(18, "Wool coat", Clothing, 78_000, 0, Soldout, "2024-02-03", "2024-03-07"),
    sample(19, "AI explained", Books, 4_500, 32, Active, "2024-02-28", "2024-03-04"),
    sample(20, "Standing desk", Furniture, 45_000, 14, Active, "2024-01-08", "2024-02-12"),
  ]
}

fn templates(category: Category) -> &'static [&'static str] {
  match category {
    Category::Electronics => &[
      "Wireless earbuds", "Smartwatch", "Tablet", "Laptop", "Monitor", "Keyboard", "Mouse",
      "Webcam", "Speaker", "Headphones", "Charger", "Power bank", "USB hub", "SSD",
      "Memory card", "Smartphone", "Gaming PC", "Projector", "Router", "NAS",
    ],
    Category::Clothing => &[
      "T-shirt", "Jeans", "Jacket", "Coat", "Sweater", "Hoodie", "Shirt", "Skirt", "Dress",
      "Cardigan", "Down jacket", "Trench coat", "Chinos", "Slacks", "Blouse", "Polo shirt",
      "Sweatshirt", "Vest", "Shorts", "Leggings",
    ],
    Category::Food => &[
      "Organic coffee", "Tea set", "Matcha", "Wine", "Olive oil", "Honey", "Chocolate",
      "Mixed nuts", "Dried fruit", "Granola", "Pasta set", "Spice set", "Jam", "Maple syrup",
      "Green tea", "Herbal tea", "Cookies", "Cheese", "Sausage", "Bacon",
    ],
    Category::Furniture => &[
      "Office chair", "Desk", "Sofa", "Bed", "Bookshelf", "TV stand", "Dining table",
      "Cabinet", "Shelf", "Dresser", "Side table", "Recliner", "Stool", "Coat rack",
      "Shoe rack", "Computer desk", "Gaming chair", "Floor lamp", "Carpet", "Cushion",
    ],
    Category::Books => &[
      "Programming primer", "Business book", "Novel", "Cookbook", "Travel guide",
      "Technical book", "Self-help book", "Manga", "Picture book", "Dictionary", "AI primer",
      "Data science", "Web development", "Design thinking", "Marketing", "Psychology primer",
      "History book", "Popular science", "Health guide", "Investing primer",
    ],
  }
}

fn price_range(category: Category) -> (u64, u64) {
  match category {
    Category::Electronics => (3_000, 300_000),
    Category::Clothing => (2_000, 100_000),
    Category::Food => (500, 30_000),
    Category::Furniture => (5_000, 200_000),
    Category::Books => (800, 10_000),
  }
}

const BRANDS: [&str; 8] = [
  "Premium", "Standard", "Pro", "Basic", "Deluxe", "Eco", "High-end", "Entry",
];
const ADJECTIVES: [&str; 8] = [
  "Quality", "Latest", "Popular", "Limited", "Select", "Recommended", "New", "Classic",
];
const STATUSES: [ProductStatus; 6] = [
  ProductStatus::Active,
  ProductStatus::Active,
  ProductStatus::Active,
  ProductStatus::Active,
  ProductStatus::Inactive,
  ProductStatus::Soldout,
];

/// Deterministic pseudo-random draws for one generated row
struct Draws {
  bytes: [u8; 32],
  pos: usize,
}

impl Draws {
  fn for_row(n: usize) -> Self {
    let digest = Sha256::digest(format!("catalog-seed:{}", n).as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    Self { bytes, pos: 0 }
  }

  fn next_u32(&mut self) -> u32 {
    let mut word = [0u8; 4];
    for b in word.iter_mut() {
      *b = self.bytes[self.pos % self.bytes.len()];
      self.pos += 1;
    }
    u32::from_le_bytes(word)
  }

  /// Uniform-ish in `[min, max]`
  fn range(&mut self, min: u64, max: u64) -> u64 {
    min + u64::from(self.next_u32()) % (max - min + 1)
  }

  fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
    &items[self.next_u32() as usize % items.len()]
  }
}

fn generated_product(n: usize) -> Product {
  let mut draws = Draws::for_row(n);

  let category = *draws.pick(&Category::ALL);
  let base = *draws.pick(templates(category));
  let brand = *draws.pick(&BRANDS);
  let adjective = *draws.pick(&ADJECTIVES);
  let name = match draws.range(0, 4) {
    0 => format!("{} {}", base, brand),
    1 => format!("{} {}", adjective, base),
    2 => format!("{} {} {}", brand, base, draws.range(1, 9)),
    3 => format!("{} Ver.{}", base, draws.range(1, 5)),
    _ => format!("{} {} {}", adjective, base, brand),
  };

  let (min_price, max_price) = price_range(category);
  let price = (draws.range(min_price, max_price) + 50) / 100 * 100;

  let status = *draws.pick(&STATUSES);
  let stock = if status == ProductStatus::Soldout {
    0
  } else {
    draws.range(0, 200)
  };

  // created in [2023-01-01, 2024-06-01], updated in [created, 2024-12-31]
  let epoch = date("2023-01-01");
  let created_at = epoch + Duration::days(draws.range(0, 517) as i64);
  let remaining = (date("2024-12-31") - created_at).num_days().max(0) as u64;
  let updated_at = created_at + Duration::days(draws.range(0, remaining) as i64);

  Product {
    id: n as u64,
    name,
    category,
    price,
    stock,
    status,
    created_at,
    updated_at,
  }
}

/// `count` generated products with ids `1..=count`. The same count always
/// yields the same rows.
pub fn generate_products(count: usize) -> Vec<Product> {
  (1..=count).map(generated_product).collect()
}
