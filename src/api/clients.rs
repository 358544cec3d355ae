//! Customer service

use super::endpoints;
use super::types::{
    ClientCreationResponse, CreateClientRequest, Customer, Page, PageRequest, RawPage,
    UserDetails,
};
use crate::error::Result;
use crate::http::ApiClient;
use std::sync::Arc;

#[derive(Clone)]
pub struct ClientService {
    client: Arc<ApiClient>,
}

impl ClientService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Create the user and its customer record in one call
    pub async fn create(&self, request: &CreateClientRequest) -> Result<ClientCreationResponse> {
        self.client.post(endpoints::CLIENTS_CREATE, request).await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Customer> {
        self.client.get(&endpoints::client_by_id(id), &[]).await
    }

    pub async fn get_by_user_id(&self, user_id: i64) -> Result<Customer> {
        self.client
            .get(&endpoints::client_by_user_id(user_id), &[])
            .await
    }

    pub async fn user_details(&self, user_id: i64) -> Result<UserDetails> {
        self.client.get(&endpoints::user_details(user_id), &[]).await
    }

    pub async fn list_all(&self) -> Result<Vec<Customer>> {
        let customers: Option<Vec<Customer>> =
            self.client.get(endpoints::CLIENTS_ALL, &[]).await?;
        Ok(customers.unwrap_or_default())
    }

    pub async fn list_paginated(&self, request: &PageRequest) -> Result<Page<Customer>> {
        let raw: RawPage<Customer> = self
            .client
            .get(endpoints::CLIENTS_PAGINATED, &request.sorted_query())
            .await?;
        Ok(Page::from_raw(raw, request))
    }

    pub async fn delete_by_user_id(&self, user_id: i64) -> Result<()> {
        self.client
            .delete(&endpoints::client_by_user_id(user_id))
            .await
    }
}
