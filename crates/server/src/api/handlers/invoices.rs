use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};

use super::{field_bytes, field_text, multipart_error};
use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::{
    parse_ids, Action, Invoice, InvoiceFile, InvoiceFilter, InvoiceForm, NewInvoice, Page,
    PageParams, Perm, UpdateInvoice,
};
use crate::state::AppState;

const fn invoice_perm(action: Action) -> Perm {
    Perm::new("invoice", "invoice", action)
}

/// Collect the invoice form. `assets` may be repeated or comma separated.
async fn read_form(mut multipart: Multipart) -> AppResult<NewInvoice> {
    let mut invoice = NewInvoice::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("number") => invoice.number = field_text(field).await?,
            Some("assets") => {
                let ids = field_text(field).await?;
                invoice.assets.extend(parse_ids(Some(&ids)));
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or("invoice").to_string();
                let bytes = field_bytes(field).await?;
                if !bytes.is_empty() {
                    invoice.file = Some(InvoiceFile { file_name, bytes });
                }
            }
            _ => {}
        }
    }
    Ok(invoice)
}

#[utoipa::path(
    post,
    path = "/api/v1/invoice/invoices/",
    tag = "invoice",
    request_body(content = InvoiceForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Invoice created", body = Invoice),
        (status = 400, description = "Validation errors")
    )
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Invoice>)> {
    user.require(&[invoice_perm(Action::Add)])?;
    let form = read_form(multipart).await?;
    let invoice = state.invoices.create_invoice(&user, form).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

#[utoipa::path(
    get,
    path = "/api/v1/invoice/invoices/",
    tag = "invoice",
    params(InvoiceFilter, PageParams),
    responses((status = 200, description = "Invoices", body = inline(Page<Invoice>)))
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<InvoiceFilter>,
    Query(page): Query<PageParams>,
) -> AppResult<Json<Page<Invoice>>> {
    user.require(&[invoice_perm(Action::View)])?;
    Ok(Json(state.invoices.list_invoices(&filter, page).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/invoice/invoices/{id}/",
    tag = "invoice",
    params(("id" = i64, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Invoice", body = Invoice),
        (status = 404, description = "Invoice not found")
    )
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Invoice>> {
    user.require(&[invoice_perm(Action::View)])?;
    Ok(Json(state.invoices.get_invoice(id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/invoice/invoices/{id}/",
    tag = "invoice",
    params(("id" = i64, Path, description = "Invoice id")),
    request_body = UpdateInvoice,
    responses(
        (status = 200, description = "Updated invoice", body = Invoice),
        (status = 404, description = "Invoice not found")
    )
)]
pub async fn update_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateInvoice>,
) -> AppResult<Json<Invoice>> {
    user.require(&[invoice_perm(Action::Edit)])?;
    Ok(Json(state.invoices.update_invoice(&user, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/invoice/invoices/{id}/",
    tag = "invoice",
    params(("id" = i64, Path, description = "Invoice id")),
    responses(
        (status = 204, description = "Invoice deleted"),
        (status = 404, description = "Invoice not found")
    )
)]
pub async fn delete_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    user.require(&[invoice_perm(Action::Delete)])?;
    state.invoices.delete_invoice(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::api::handlers::test_support::{app, login, send};
    use crate::testing::Fixtures;

    #[tokio::test]
    async fn test_create_invoice_from_form() {
        let (app, state) = app().await;
        let group = Fixtures::group(&state.db, "MASTER", &[]).await;
        Fixtures::user_in_group(&state.db, "ana", group).await;
        let first = Fixtures::asset(&state.db, "NB-301").await;
        let second = Fixtures::asset(&state.db, "NB-302").await;
        let token = login(&app, "ana").await;

        let boundary = "nf-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"number\"\r\n\r\nNF-301\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"assets\"\r\n\r\n{first},{second}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"nf.pdf\"\r\nContent-Type: application/pdf\r\n\r\n%PDF-1.4\r\n\
             --{b}--\r\n",
            b = boundary,
            first = first,
            second = second
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/invoice/invoices/")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let invoice: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(invoice["number"], "NF-301");
        assert_eq!(invoice["fileName"], "nf.pdf");
        assert_eq!(invoice["assets"].as_array().unwrap().len(), 2);

        let uri = format!("/api/v1/invoice/invoices/{}/", invoice["id"]);
        let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&app, "GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["field"], "invoiceId");
    }
}
