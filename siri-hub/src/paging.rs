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

//! Size limiting shared by pull pagination and push splitting.

/// Splits `items` into ordered, non-overlapping chunks of at most `limit` elements.
///
/// `None` keeps everything in one chunk. Empty input yields no chunks, so callers
/// never emit empty deliveries. A zero limit is treated as one.
pub fn split_into_chunks<T>(items: Vec<T>, limit: Option<usize>) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let Some(limit) = limit.map(|limit| limit.max(1)) else {
        return vec![items];
    };

    let mut chunks = Vec::with_capacity(items.len().div_ceil(limit));
    let mut current = Vec::with_capacity(limit.min(items.len()));
    for item in items {
        current.push(item);
        if current.len() == limit {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// First page of `items` plus whether anything was left behind.
pub fn take_page<T>(items: Vec<T>, limit: Option<usize>) -> (Vec<T>, Vec<T>) {
    let mut chunks = split_into_chunks(items, limit).into_iter();
    let page = chunks.next().unwrap_or_default();
    let rest = chunks.flatten().collect();
    (page, rest)
}
