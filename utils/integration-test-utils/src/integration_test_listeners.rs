/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use dynamic_router::{DeliveryFailure, DeliveryFailureListener};
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Clone, Default)]
pub struct RecordingFailureListener {
    failures: Arc<Mutex<Vec<DeliveryFailure>>>,
}

impl RecordingFailureListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<DeliveryFailure> {
        self.failures.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.failures.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DeliveryFailureListener for RecordingFailureListener {
    fn on_delivery_failure(&self, failure: DeliveryFailure) {
        debug!("within recording_failure_listener! failure: {failure}");
        self.failures.lock().unwrap().push(failure);
    }
}
