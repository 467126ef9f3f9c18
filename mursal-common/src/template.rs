//! Message template rendering
//!
//! Templates are plain strings with literal `{placeholder}` substitution.
//! Unknown placeholders are left untouched so operators can stage new
//! fields in templates before the engine learns about them.

use serde::{Deserialize, Serialize};

use crate::message::MessageKind;

/// The five message templates, one per kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSet {
    #[serde(default = "default_new_order")]
    pub new_order: String,
    #[serde(default = "default_no_answer")]
    pub no_answer: String,
    #[serde(default = "default_shipped")]
    pub shipped: String,
    #[serde(default = "default_rejected_offer")]
    pub rejected_offer: String,
    #[serde(default = "default_reminder")]
    pub reminder: String,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self {
            new_order: default_new_order(),
            no_answer: default_no_answer(),
            shipped: default_shipped(),
            rejected_offer: default_rejected_offer(),
            reminder: default_reminder(),
        }
    }
}

impl TemplateSet {
    /// The template text for a message kind.
    #[must_use]
    pub fn for_kind(&self, kind: MessageKind) -> &str {
        match kind {
            MessageKind::NewOrder => &self.new_order,
            MessageKind::NoAnswer => &self.no_answer,
            MessageKind::Shipped => &self.shipped,
            MessageKind::RejectedOffer => &self.rejected_offer,
            MessageKind::Reminder => &self.reminder,
        }
    }
}

fn default_new_order() -> String {
    "مرحباً {name}! تم استلام طلبك رقم {orderId} ({productName}) بإجمالي {amount} جنيه. سنتواصل معك قريباً لتأكيد الطلب. {companyName}".to_string()
}

fn default_no_answer() -> String {
    "عزيزي {name}، حاولنا الاتصال بك بخصوص طلبك رقم {orderId} ولم نتمكن من الوصول إليك. برجاء الرد علينا لإتمام التأكيد. {companyName}".to_string()
}

fn default_shipped() -> String {
    "عزيزي {name}، تم شحن طلبك رقم {orderId}. رقم التتبع: {trackingNumber}. {companyName}"
        .to_string()
}

fn default_rejected_offer() -> String {
    "عزيزي {name}، عرض خاص على طلبك رقم {orderId}: {discountedAmount} جنيه بدلاً من {amount} جنيه، بتوفير {savedAmount} جنيه. {companyName}".to_string()
}

fn default_reminder() -> String {
    "تذكير: عزيزي {name}، طلبك رقم {orderId} ({productName}) لا يزال في انتظار التأكيد. {companyName}".to_string()
}

/// Field values substituted into a template.
///
/// Absent fields fall back to fixed sentinels rather than failing the
/// render: a message with a placeholder default still reaches the customer.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    pub name: Option<String>,
    pub order_id: Option<String>,
    pub amount: Option<f64>,
    pub product_name: Option<String>,
    pub tracking_number: Option<String>,
    pub discounted_amount: Option<f64>,
    pub saved_amount: Option<f64>,
    pub company_name: Option<String>,
}

/// Render a template by literal substitution.
#[must_use]
pub fn render(template: &str, ctx: &TemplateContext) -> String {
    let order_id = ctx.order_id.as_deref().unwrap_or("N/A");
    let tracking = ctx
        .tracking_number
        .clone()
        .unwrap_or_else(|| format!("TRK{order_id}"));

    template
        .replace("{name}", ctx.name.as_deref().unwrap_or(""))
        .replace("{orderId}", order_id)
        .replace("{amount}", &format_amount(ctx.amount))
        .replace(
            "{productName}",
            ctx.product_name.as_deref().unwrap_or("المنتج"),
        )
        .replace("{trackingNumber}", &tracking)
        .replace("{discountedAmount}", &format_amount(ctx.discounted_amount))
        .replace("{savedAmount}", &format_amount(ctx.saved_amount))
        .replace("{companyName}", ctx.company_name.as_deref().unwrap_or(""))
}

/// Format a monetary amount, dropping a trailing `.0` on whole values.
fn format_amount(amount: Option<f64>) -> String {
    amount.map_or_else(
        || "0".to_string(),
        |a| {
            if (a.fract()).abs() < f64::EPSILON {
                format!("{a:.0}")
            } else {
                format!("{a}")
            }
        },
    )
}
