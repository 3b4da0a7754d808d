//! Operator CLI for the commerce engine: catalog setup, carts, orders and
//! fulfilments against a PostgreSQL database.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::env;
use std::ffi::OsString;
use std::io;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use commerce::config::CommerceSettings;
use commerce::domain::ports::{
    AddCartLineRequest, AdjustStockRequest, CartCommand, CartQuery, CatalogCommand,
    CreateCartRequest, CreateFulfilmentRequest, CreateOrderFromCartRequest, CreateOrderRequest,
    CreateProductRequest, CreateShopRequest, CreateVariantRequest, FulfilmentCommand,
    FulfilmentLineRequest, FulfilmentQuery, ListOrdersRequest, OrderCommand, OrderLineRequest,
    OrderQuery, RemoveCartLineRequest, UpdateFulfilmentRequest,
};
use commerce::domain::{
    AddressId, CartId, CartLineId, CartService, CatalogService, ContactId, CurrencyCode,
    CustomerRefs, FulfilmentId, FulfilmentService, FulfilmentStatus, Money, OrderId,
    OrderLineId, OrderService, ProductId, ProfileId, ShopId, VariantId,
};
use commerce::outbound::persistence::{
    DbPool, DieselCartRepository, DieselCatalogRepository, DieselFulfilmentRepository,
    DieselOrderRepository, DieselVariantStockGateway, run_migrations,
};
use mockable::{Clock, DefaultClock};
use ortho_config::OrthoConfig;
use serde::Serialize;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// `commerce-admin` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "commerce-admin",
    about = "Manage shops, carts, orders and fulfilments",
    version
)]
struct CliArgs {
    /// Database connection URL. Falls back to `COMMERCE_DATABASE_URL`, then
    /// `DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url", global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Apply pending schema migrations.
    Migrate,
    /// Open a shop.
    CreateShop {
        #[arg(long)]
        name: String,
        /// Explicit slug; derived from the name when omitted.
        #[arg(long)]
        slug: Option<String>,
    },
    /// Add a product to a shop.
    CreateProduct {
        #[arg(long = "shop-id")]
        shop_id: ShopId,
        #[arg(long)]
        name: String,
    },
    /// Add a purchasable variant to a product.
    CreateVariant {
        #[arg(long = "product-id")]
        product_id: ProductId,
        #[arg(long)]
        sku: String,
        #[arg(long)]
        name: String,
        /// ISO 4217 currency code.
        #[arg(long)]
        currency: String,
        /// Decimal unit price such as `10.50`.
        #[arg(long)]
        price: String,
        #[arg(long, default_value_t = 0)]
        stock: i64,
    },
    /// Restock (positive delta) or withdraw (negative delta) a variant.
    AdjustStock {
        #[arg(long = "variant-id")]
        variant_id: VariantId,
        #[arg(long, allow_hyphen_values = true)]
        delta: i64,
    },
    /// Open an empty cart.
    CreateCart {
        #[arg(long = "shop-id")]
        shop_id: ShopId,
        #[command(flatten)]
        customer: CustomerArgs,
    },
    /// Add a variant to a cart, merging with an existing line.
    AddToCart {
        #[arg(long = "cart-id")]
        cart_id: CartId,
        #[arg(long = "variant-id")]
        variant_id: VariantId,
        #[arg(long, allow_hyphen_values = true)]
        quantity: i64,
    },
    /// Remove a line from a cart.
    RemoveFromCart {
        #[arg(long = "cart-id")]
        cart_id: CartId,
        #[arg(long = "line-id")]
        line_id: CartLineId,
    },
    /// Show a cart.
    GetCart {
        #[arg(long = "cart-id")]
        cart_id: CartId,
    },
    /// Place an order from explicit lines.
    PlaceOrder {
        #[arg(long = "shop-id")]
        shop_id: ShopId,
        /// Order line as `variant_id:quantity`; repeat for more lines.
        #[arg(long = "line", value_name = "variant_id:quantity", value_parser = parse_order_line)]
        lines: Vec<OrderLineRequest>,
        #[arg(long = "idempotency-key")]
        idempotency_key: Option<String>,
        #[arg(long = "address-id")]
        address_id: Option<AddressId>,
        #[command(flatten)]
        customer: CustomerArgs,
    },
    /// Convert an active cart into an order.
    Checkout {
        #[arg(long = "cart-id")]
        cart_id: CartId,
        #[arg(long = "address-id")]
        address_id: Option<AddressId>,
        #[command(flatten)]
        customer: CustomerArgs,
    },
    /// Show an order.
    GetOrder {
        #[arg(long = "order-id")]
        order_id: OrderId,
    },
    /// List a shop's orders, newest first.
    ListOrders {
        #[arg(long = "shop-id")]
        shop_id: ShopId,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        limit: i64,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i64,
    },
    /// Cancel a confirmed, unfulfilled order and restock its lines.
    CancelOrder {
        #[arg(long = "order-id")]
        order_id: OrderId,
    },
    /// Record a shipment.
    Fulfil {
        #[arg(long = "order-id")]
        order_id: OrderId,
        /// Shipped line as `order_line_id:quantity`; repeat for more lines.
        #[arg(
            long = "line",
            value_name = "order_line_id:quantity",
            value_parser = parse_fulfilment_line
        )]
        lines: Vec<FulfilmentLineRequest>,
    },
    /// Change a shipment's status, carrier or tracking number.
    UpdateFulfilment {
        #[arg(long = "fulfilment-id")]
        fulfilment_id: FulfilmentId,
        /// Fields to apply; all of them when omitted.
        #[arg(long = "mask", value_name = "field")]
        field_mask: Vec<String>,
        #[arg(long)]
        status: Option<FulfilmentStatus>,
        #[arg(long)]
        carrier: Option<String>,
        #[arg(long = "tracking-number")]
        tracking_number: Option<String>,
    },
    /// Show a shipment.
    GetFulfilment {
        #[arg(long = "fulfilment-id")]
        fulfilment_id: FulfilmentId,
    },
    /// List an order's shipments.
    ListFulfilments {
        #[arg(long = "order-id")]
        order_id: OrderId,
    },
}

/// Owner references shared by cart and order commands.
#[derive(Debug, Clone, Copy, clap::Args)]
struct CustomerArgs {
    #[arg(long = "profile-id")]
    profile_id: Option<ProfileId>,
    #[arg(long = "contact-id")]
    contact_id: Option<ContactId>,
}

impl From<CustomerArgs> for CustomerRefs {
    fn from(args: CustomerArgs) -> Self {
        Self {
            profile_id: args.profile_id,
            contact_id: args.contact_id,
        }
    }
}

fn main() -> io::Result<()> {
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(%error, "tracing init failed");
    }

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let settings = CommerceSettings::load_from_iter([OsString::from("commerce-admin")])
        .map_err(|error| io::Error::other(format!("load settings: {error}")))?;
    let database_url = resolve_database_url(args.database_url, settings.database_url.clone())?;

    if matches!(args.command, Command::Migrate) {
        let applied = tokio::task::spawn_blocking(move || run_migrations(&database_url))
            .await
            .map_err(|error| io::Error::other(format!("migration task failed: {error}")))?
            .map_err(io::Error::other)?;
        info!(applied, "migrations complete");
        return print_json(&serde_json::json!({ "applied": applied }));
    }

    let pool = DbPool::new(settings.pool_config(&database_url))
        .await
        .map_err(|error| io::Error::other(format!("create database pool: {error}")))?;
    let services = Services::new(pool, &settings);
    services.run(args.command).await
}

type Catalog = CatalogService<DieselCatalogRepository, DieselVariantStockGateway>;
type Carts = CartService<DieselCartRepository, DieselVariantStockGateway, DieselCatalogRepository>;
type Orders = OrderService<
    DieselOrderRepository,
    DieselVariantStockGateway,
    DieselCartRepository,
    DieselCatalogRepository,
>;
type Fulfilments = FulfilmentService<DieselFulfilmentRepository, DieselOrderRepository>;

/// Domain services wired to the Diesel adapters.
struct Services {
    catalog: Catalog,
    carts: Carts,
    orders: Orders,
    fulfilments: Fulfilments,
}

impl Services {
    fn new(pool: DbPool, settings: &CommerceSettings) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let catalog_repo = Arc::new(DieselCatalogRepository::new(pool.clone()));
        let stock = Arc::new(DieselVariantStockGateway::new(pool.clone()));
        let cart_repo = Arc::new(DieselCartRepository::new(pool.clone()));
        let order_repo = Arc::new(DieselOrderRepository::new(pool.clone()));
        let fulfilment_repo = Arc::new(DieselFulfilmentRepository::new(pool));

        Self {
            catalog: CatalogService::new(catalog_repo.clone(), stock.clone(), clock.clone()),
            carts: CartService::new(
                cart_repo.clone(),
                stock.clone(),
                catalog_repo.clone(),
                clock.clone(),
            ),
            orders: OrderService::new(
                order_repo.clone(),
                stock,
                cart_repo,
                catalog_repo,
                clock.clone(),
            )
            .with_listing_config(settings.listing_config()),
            fulfilments: FulfilmentService::new(fulfilment_repo, order_repo, clock),
        }
    }

    async fn run(&self, command: Command) -> io::Result<()> {
        match command {
            Command::Migrate => Ok(()),
            Command::CreateShop { name, slug } => print_result(
                self.catalog
                    .create_shop(CreateShopRequest { name, slug })
                    .await,
            ),
            Command::CreateProduct { shop_id, name } => print_result(
                self.catalog
                    .create_product(CreateProductRequest { shop_id, name })
                    .await,
            ),
            Command::CreateVariant {
                product_id,
                sku,
                name,
                currency,
                price,
                stock,
            } => {
                let unit_price = parse_price(&currency, &price).map_err(io::Error::other)?;
                print_result(
                    self.catalog
                        .create_variant(CreateVariantRequest {
                            product_id,
                            sku,
                            name,
                            unit_price,
                            stock_quantity: stock,
                        })
                        .await,
                )
            }
            Command::AdjustStock { variant_id, delta } => print_result(
                self.catalog
                    .adjust_stock(AdjustStockRequest { variant_id, delta })
                    .await,
            ),
            Command::CreateCart { shop_id, customer } => print_result(
                self.carts
                    .create_cart(CreateCartRequest {
                        shop_id,
                        customer: customer.into(),
                    })
                    .await,
            ),
            Command::AddToCart {
                cart_id,
                variant_id,
                quantity,
            } => print_result(
                self.carts
                    .add_line(AddCartLineRequest {
                        cart_id,
                        variant_id,
                        quantity,
                    })
                    .await,
            ),
            Command::RemoveFromCart { cart_id, line_id } => print_result(
                self.carts
                    .remove_line(RemoveCartLineRequest { cart_id, line_id })
                    .await,
            ),
            Command::GetCart { cart_id } => print_result(self.carts.get_cart(&cart_id).await),
            Command::PlaceOrder {
                shop_id,
                lines,
                idempotency_key,
                address_id,
                customer,
            } => print_result(
                self.orders
                    .create_order(CreateOrderRequest {
                        shop_id,
                        customer: customer.into(),
                        address_id,
                        idempotency_key,
                        lines,
                    })
                    .await,
            ),
            Command::Checkout {
                cart_id,
                address_id,
                customer,
            } => print_result(
                self.orders
                    .create_order_from_cart(CreateOrderFromCartRequest {
                        cart_id,
                        customer: customer.into(),
                        address_id,
                    })
                    .await,
            ),
            Command::GetOrder { order_id } => {
                print_result(self.orders.get_order(&order_id).await)
            }
            Command::ListOrders {
                shop_id,
                limit,
                offset,
            } => print_result(
                self.orders
                    .list_orders(ListOrdersRequest {
                        shop_id,
                        limit,
                        offset,
                    })
                    .await,
            ),
            Command::CancelOrder { order_id } => {
                print_result(self.orders.cancel_order(&order_id).await)
            }
            Command::Fulfil { order_id, lines } => print_result(
                self.fulfilments
                    .create_fulfilment(CreateFulfilmentRequest { order_id, lines })
                    .await,
            ),
            Command::UpdateFulfilment {
                fulfilment_id,
                field_mask,
                status,
                carrier,
                tracking_number,
            } => print_result(
                self.fulfilments
                    .update_fulfilment(UpdateFulfilmentRequest {
                        fulfilment_id,
                        field_mask,
                        status,
                        carrier,
                        tracking_number,
                    })
                    .await,
            ),
            Command::GetFulfilment { fulfilment_id } => {
                print_result(self.fulfilments.get_fulfilment(&fulfilment_id).await)
            }
            Command::ListFulfilments { order_id } => {
                print_result(self.fulfilments.list_fulfilments(&order_id).await)
            }
        }
    }
}

fn print_result<T: Serialize>(result: Result<T, commerce::domain::Error>) -> io::Result<()> {
    let value = result.map_err(|error| {
        io::Error::other(format!("{}: {}", error.code().as_str(), error.message()))
    })?;
    print_json(&value)
}

fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|error| io::Error::other(format!("render output: {error}")))?;
    println!("{rendered}");
    Ok(())
}

fn split_pair(raw: &str) -> Result<(&str, i64), String> {
    let (id, quantity) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `id:quantity`, got `{raw}`"))?;
    let quantity = quantity
        .trim()
        .parse::<i64>()
        .map_err(|error| format!("invalid quantity in `{raw}`: {error}"))?;
    Ok((id.trim(), quantity))
}

fn parse_order_line(raw: &str) -> Result<OrderLineRequest, String> {
    let (id, quantity) = split_pair(raw)?;
    let variant_id = VariantId::new(id).map_err(|error| error.to_string())?;
    Ok(OrderLineRequest {
        variant_id,
        quantity,
    })
}

fn parse_fulfilment_line(raw: &str) -> Result<FulfilmentLineRequest, String> {
    let (id, quantity) = split_pair(raw)?;
    let order_line_id = OrderLineId::new(id).map_err(|error| error.to_string())?;
    Ok(FulfilmentLineRequest {
        order_line_id,
        quantity,
    })
}

fn parse_price(currency: &str, price: &str) -> Result<Money, String> {
    let currency = CurrencyCode::new(currency).map_err(|error| error.to_string())?;
    Money::parse_decimal(currency, price).map_err(|error| error.to_string())
}

fn resolve_database_url(
    explicit: Option<String>,
    configured: Option<String>,
) -> io::Result<String> {
    if let Some(value) = explicit {
        if value.trim().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "--database-url must not be empty when provided",
            ));
        }
        return Ok(value);
    }
    if let Some(value) = configured.filter(|value| !value.trim().is_empty()) {
        return Ok(value);
    }

    let from_env = env::var("DATABASE_URL").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "database URL missing: set --database-url, COMMERCE_DATABASE_URL or DATABASE_URL",
        )
    })?;
    if from_env.trim().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "DATABASE_URL must not be empty",
        ));
    }
    Ok(from_env)
}
