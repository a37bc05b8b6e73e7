use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{AuditLogList, DashboardStats, InventoryAdjustRequest, LowStockList},
        appointments::{AppointmentList, CreateAppointmentRequest, UpdateAppointmentRequest},
        auth::{LoginRequest, RefreshRequest, RegisterRequest, TokenPair},
        cart::{AddToCartRequest, CartLine, CartView, UpdateCartItemRequest},
        collections::{CollectionList, CreateCollectionRequest, UpdateCollectionRequest},
        designers::{CreateDesignerRequest, DesignerList, UpdateDesignerRequest},
        dresses::{CreateDressRequest, DressList, DressReviews, UpdateDressRequest},
        orders::{OrderList, OrderWithItems, UpdateOrderStatusRequest},
        payments::{InitiatePaymentRequest, PaymentWithOrder},
        reviews::{CreateReviewRequest, ReviewList, UpdateReviewRequest},
        users::{UpdateUserRequest, UserList},
    },
    models::{
        Appointment, AppointmentStatus, AuditLog, CartItem, Collection, Designer, Dress, Order,
        OrderItem, OrderStatus, Payment, PaymentMethod, PaymentStatus, Review, Role, User,
    },
    response::Meta,
    routes::{
        admin, appointments, auth, cart, collections, designers, dresses, health, orders, params,
        payments, reviews, users,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::token,
        auth::refresh,
        auth::logout,
        users::list_users,
        users::me,
        users::get_user,
        users::update_user,
        users::delete_user,
        designers::list_designers,
        designers::get_designer,
        designers::create_designer,
        designers::update_designer,
        designers::delete_designer,
        collections::list_collections,
        collections::get_collection,
        collections::create_collection,
        collections::update_collection,
        collections::delete_collection,
        dresses::list_dresses,
        dresses::get_dress,
        dresses::create_dress,
        dresses::update_dress,
        dresses::delete_dress,
        dresses::dress_reviews,
        cart::get_cart,
        cart::add_item,
        cart::update_item,
        cart::remove_item,
        cart::clear_cart,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::cancel_order,
        payments::initiate_payment,
        payments::verify_payment,
        payments::get_payment,
        appointments::list_appointments,
        appointments::create_appointment,
        appointments::get_appointment,
        appointments::update_appointment,
        appointments::cancel_appointment,
        reviews::list_reviews,
        reviews::create_review,
        reviews::update_review,
        reviews::delete_review,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::list_low_stock,
        admin::adjust_inventory,
        admin::list_audit_logs,
        admin::stats
    ),
    components(
        schemas(
            Role,
            OrderStatus,
            PaymentMethod,
            PaymentStatus,
            AppointmentStatus,
            User,
            Designer,
            Collection,
            Dress,
            CartItem,
            Order,
            OrderItem,
            Payment,
            Appointment,
            Review,
            AuditLog,
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            TokenPair,
            UpdateUserRequest,
            UserList,
            CreateDesignerRequest,
            UpdateDesignerRequest,
            DesignerList,
            CreateCollectionRequest,
            UpdateCollectionRequest,
            CollectionList,
            CreateDressRequest,
            UpdateDressRequest,
            DressList,
            DressReviews,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartView,
            CartLine,
            OrderList,
            OrderWithItems,
            UpdateOrderStatusRequest,
            InitiatePaymentRequest,
            PaymentWithOrder,
            CreateAppointmentRequest,
            UpdateAppointmentRequest,
            AppointmentList,
            CreateReviewRequest,
            UpdateReviewRequest,
            ReviewList,
            InventoryAdjustRequest,
            LowStockList,
            AuditLogList,
            DashboardStats,
            params::Pagination,
            params::DressQuery,
            params::OrderListQuery,
            Meta
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and JWT tokens"),
        (name = "Users", description = "User accounts"),
        (name = "Designers", description = "Designer profiles"),
        (name = "Collections", description = "Designer collections"),
        (name = "Dresses", description = "Dress catalog"),
        (name = "Cart", description = "Shopping cart"),
        (name = "Orders", description = "Checkout and orders"),
        (name = "Payments", description = "Payment gateway integration"),
        (name = "Appointments", description = "Fitting appointments"),
        (name = "Reviews", description = "Dress reviews"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
